//! End-to-end smoke test: render the demo scene and check the PPM file
//! it produces has a sane header and the expected payload size.

use std::io::Read;

#[test]
fn demo_scene_writes_a_valid_ppm() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("demo.ppm");

    let device = rg_cli::render_demo_scene(64, 48).unwrap();
    rg_cli::write_ppm(&path, &device).unwrap();

    let mut contents = Vec::new();
    std::fs::File::open(&path).unwrap().read_to_end(&mut contents).unwrap();

    let header = b"P6\n64 48\n255\n";
    assert!(contents.starts_with(header), "unexpected PPM header");
    assert_eq!(contents.len(), header.len() + 64 * 48 * 3);
}

#[test]
fn tiny_canvas_does_not_panic() {
    let device = rg_cli::render_demo_scene(4, 4).unwrap();
    let dir = tempfile::tempdir().unwrap();
    rg_cli::write_ppm(dir.path().join("tiny.ppm"), &device).unwrap();
}
