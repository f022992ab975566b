use aisle_asset::{
    import_mesh, import_mesh_slice, MeshCache, MeshLookup, MeshRegistry, UrlMeshSource,
};
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("aisle_asset_test_{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_import_fixture_triangle() {
    let mesh = import_mesh(fixture("triangle.gltf")).unwrap();
    assert_eq!(mesh.vertex_count(), 3);
    assert_eq!(mesh.triangle_count(), 1);
    assert_eq!(mesh.indices, vec![0, 1, 2]);
    // No NORMAL attribute in the fixture
    assert!(mesh.normals.iter().all(|n| *n == [0.0, 1.0, 0.0]));

    let bounds = mesh.bounds().unwrap();
    assert_eq!(bounds.size(), [2.0, 3.0, 1.0]);
}

#[test]
fn test_import_slice_matches_file_import() {
    let bytes = std::fs::read(fixture("triangle.gltf")).unwrap();
    let from_slice = import_mesh_slice(&bytes).unwrap();
    let from_file = import_mesh(fixture("triangle.gltf")).unwrap();
    assert_eq!(from_slice, from_file);
}

#[test]
fn test_import_garbage_is_error() {
    assert!(import_mesh_slice(b"not a gltf").is_err());
}

#[test]
fn test_cache_with_registry_and_file_source() {
    let dir = temp_dir();
    let registry_path = dir.join("meshes.toml");
    let url = format!("file://{}", fixture("triangle.gltf").display());
    std::fs::write(
        &registry_path,
        format!("[meshes]\nshelf = \"{}\"\nwall = \"{}\"\n", url, dir.join("gone.glb").display()),
    )
    .unwrap();

    let registry = MeshRegistry::load_from_file(&registry_path).unwrap();
    let source = UrlMeshSource;
    let mut cache = MeshCache::new();

    let shelf = cache
        .load("shelf", registry.url_for("shelf").unwrap(), &source)
        .unwrap();
    assert_eq!(shelf.original_size, [2.0, 3.0, 1.0]);
    let bounds = shelf.mesh.bounds().unwrap();
    assert_eq!(bounds.min[1], 0.0);
    assert_eq!(bounds.min[0], -1.0);

    assert!(cache
        .load("wall", registry.url_for("wall").unwrap(), &source)
        .is_none());
    assert_eq!(
        cache.request("wall", registry.url_for("wall").unwrap()),
        MeshLookup::Failed
    );

    std::fs::remove_dir_all(&dir).ok();
}
