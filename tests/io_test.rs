//! STL and 3MF input/output through the public API

mod common;

use common::box_solid;
use fastener_assembly::io::{MeshFormat, load_solid, save_solid};
use fastener_assembly::stl::StlEncoding;
use fastener_assembly::{Error, MeshHandle};
use std::io::{Cursor, Write};
use std::path::Path;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
</Types>"#;

fn rels(target: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Target="{}" Id="rel0" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
</Relationships>"#,
        target
    )
}

/// Unit cube model placed twice: once as-is, once shifted by `shift` along x
fn cube_model(shift: f64) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<model unit="millimeter" xml:lang="en-US" xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02">
  <resources>
    <object id="1" type="model">
      <mesh>
        <vertices>
          <vertex x="0" y="0" z="0"/>
          <vertex x="1" y="0" z="0"/>
          <vertex x="1" y="1" z="0"/>
          <vertex x="0" y="1" z="0"/>
          <vertex x="0" y="0" z="1"/>
          <vertex x="1" y="0" z="1"/>
          <vertex x="1" y="1" z="1"/>
          <vertex x="0" y="1" z="1"/>
        </vertices>
        <triangles>
          <triangle v1="0" v2="2" v3="1"/>
          <triangle v1="0" v2="3" v3="2"/>
          <triangle v1="4" v2="5" v3="6"/>
          <triangle v1="4" v2="6" v3="7"/>
          <triangle v1="0" v2="1" v3="5"/>
          <triangle v1="0" v2="5" v3="4"/>
          <triangle v1="1" v2="2" v3="6"/>
          <triangle v1="1" v2="6" v3="5"/>
          <triangle v1="2" v2="3" v3="7"/>
          <triangle v1="2" v2="7" v3="6"/>
          <triangle v1="3" v2="0" v3="4"/>
          <triangle v1="3" v2="4" v3="7"/>
        </triangles>
      </mesh>
    </object>
  </resources>
  <build>
    <item objectid="1"/>
    <item objectid="1" transform="1 0 0 0 1 0 0 0 1 {} 0 0"/>
  </build>
</model>"#,
        shift
    )
}

/// Build a 3MF package in memory
fn package(parts: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in parts {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn write_package(path: &Path, parts: &[(&str, &str)]) {
    std::fs::write(path, package(parts)).unwrap();
}

#[test]
fn test_stl_binary_and_ascii_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let solid = box_solid([-1.0, 0.5, 2.0], [3.0, 1.5, 4.25]);

    for encoding in [StlEncoding::Binary, StlEncoding::Ascii] {
        let path = dir.path().join(format!("box_{:?}.stl", encoding));
        save_solid(&solid, &path, encoding).unwrap();

        let loaded = load_solid(&path).unwrap();
        assert_eq!(loaded.vertex_count(), 8, "{:?}", encoding);
        assert_eq!(loaded.triangle_count(), 12);

        let mesh = MeshHandle::from_solid(loaded);
        assert_eq!(mesh.dimensions(), [2.25, 4.0, 1.0]);
        assert!((mesh.volume() - 9.0).abs() < 1e-9);
    }
}

#[test]
fn test_uppercase_stl_extension_loads() {
    let dir = tempfile::tempdir().unwrap();
    let lower = dir.path().join("part.stl");
    save_solid(&box_solid([0.0; 3], [1.0; 3]), &lower, StlEncoding::Binary).unwrap();
    let upper = dir.path().join("PART.STL");
    std::fs::rename(&lower, &upper).unwrap();

    assert_eq!(MeshFormat::from_path(&upper), Some(MeshFormat::Stl));
    assert_eq!(load_solid(&upper).unwrap().triangle_count(), 12);
}

#[test]
fn test_threemf_build_items_merged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cubes.3mf");
    let model = cube_model(5.0);
    let rels = rels("/3D/3dmodel.model");
    write_package(
        &path,
        &[
            ("[Content_Types].xml", CONTENT_TYPES),
            ("_rels/.rels", &rels),
            ("3D/3dmodel.model", &model),
        ],
    );

    let mesh = MeshHandle::load(&path).unwrap();
    assert_eq!(mesh.vertex_count(), 16);
    assert_eq!(mesh.triangle_count(), 24);
    assert_eq!(mesh.width(), 6.0);
    assert!((mesh.volume() - 2.0).abs() < 1e-12);
}

#[test]
fn test_threemf_percent_encoded_target() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("encoded.3mf");
    let model = cube_model(2.0);
    let rels = rels("/3D/my%20model.model");
    write_package(
        &path,
        &[
            ("[Content_Types].xml", CONTENT_TYPES),
            ("_rels/.rels", &rels),
            ("3D/my model.model", &model),
        ],
    );

    let solid = load_solid(&path).unwrap();
    assert_eq!(solid.triangle_count(), 24);
}

#[test]
fn test_threemf_without_rels_uses_default_part() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("norels.3mf");
    let model = cube_model(3.0);
    write_package(&path, &[("3D/3dmodel.model", &model)]);

    assert_eq!(load_solid(&path).unwrap().vertex_count(), 16);
}

#[test]
fn test_threemf_missing_model_part() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.3mf");
    let rels = rels("/3D/3dmodel.model");
    write_package(&path, &[("_rels/.rels", &rels)]);

    let err = load_solid(&path).unwrap_err();
    assert!(matches!(err, Error::MissingFile(_)), "{}", err);
}

#[test]
fn test_threemf_not_a_zip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.3mf");
    std::fs::write(&path, b"definitely not a zip archive").unwrap();

    let err = load_solid(&path).unwrap_err();
    assert!(matches!(err, Error::Zip(_)), "{}", err);
}

#[test]
fn test_save_requires_stl_extension() {
    let dir = tempfile::tempdir().unwrap();
    let mesh = MeshHandle::from_solid(box_solid([0.0; 3], [1.0; 3]));

    let err = mesh.save(dir.path().join("out.3mf")).unwrap_err();
    assert!(matches!(err, Error::UnsupportedExportFormat(_)));
    assert!(mesh.save(dir.path().join("out.stl")).is_ok());
}
