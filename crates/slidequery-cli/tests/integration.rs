//! Integration tests for the slidequery CLI
//!
//! A small presentation is written to a temporary directory and each
//! command's JSON output is checked.

use std::fs;
use std::io::{Cursor, Write};
use std::path::PathBuf;

use serde_json::{json, Value};
use slidequery_cli::{
    analyze_command, attributes_command, extract_command, formatted_command, overview_command,
    query_command, slide_command, tables_command, Options,
};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const TITLE_AND_TEXT: &str = r#"
    <p:sp>
      <p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr>
      <p:spPr/>
      <p:txBody><a:bodyPr/><a:p><a:r><a:t>Launch Plan</a:t></a:r></a:p></p:txBody>
    </p:sp>
    <p:sp>
      <p:nvSpPr><p:cNvPr id="3" name="TextBox 2"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr>
      <p:spPr/>
      <p:txBody><a:bodyPr/><a:p><a:r><a:t>Ship by </a:t></a:r><a:r><a:rPr b="1"/><a:t>Friday</a:t></a:r></a:p></p:txBody>
    </p:sp>"#;

const MILESTONE_TABLE: &str = r#"
    <p:graphicFrame>
      <p:nvGraphicFramePr><p:cNvPr id="4" name="Milestones"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr>
      <p:xfrm><a:off x="0" y="0"/><a:ext cx="4064000" cy="741680"/></p:xfrm>
      <a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl>
        <a:tblGrid><a:gridCol w="2032000"/><a:gridCol w="2032000"/></a:tblGrid>
        <a:tr h="370840">
          <a:tc><a:txBody><a:bodyPr/><a:p><a:r><a:t>Task</a:t></a:r></a:p></a:txBody><a:tcPr/></a:tc>
          <a:tc><a:txBody><a:bodyPr/><a:p><a:r><a:t>Owner</a:t></a:r></a:p></a:txBody><a:tcPr/></a:tc>
        </a:tr>
        <a:tr h="370840">
          <a:tc><a:txBody><a:bodyPr/><a:p><a:r><a:rPr b="1"/><a:t>Beta</a:t></a:r></a:p></a:txBody><a:tcPr/></a:tc>
          <a:tc><a:txBody><a:bodyPr/><a:p><a:r><a:t>Dana</a:t></a:r></a:p></a:txBody><a:tcPr/></a:tc>
        </a:tr>
      </a:tbl></a:graphicData></a:graphic>
    </p:graphicFrame>"#;

/// Create a one-slide presentation with a title and a partly bold text box
fn create_test_presentation() -> Vec<u8> {
    build_presentation(TITLE_AND_TEXT)
}

/// One-slide presentation whose shape tree holds `shapes`
fn build_presentation(shapes: &str) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    let mut zip = ZipWriter::new(&mut buffer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(br#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
</Types>"#).unwrap();

    zip.start_file("_rels/.rels", options).unwrap();
    zip.write_all(br#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/>
</Relationships>"#).unwrap();

    zip.start_file("ppt/presentation.xml", options).unwrap();
    zip.write_all(br#"<?xml version="1.0" encoding="UTF-8"?>
<p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <p:sldIdLst><p:sldId id="256" r:id="rId2"/></p:sldIdLst>
  <p:sldSz cx="9144000" cy="6858000"/>
</p:presentation>"#).unwrap();

    zip.start_file("ppt/_rels/presentation.xml.rels", options)
        .unwrap();
    zip.write_all(br#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide1.xml"/>
</Relationships>"#).unwrap();

    zip.start_file("ppt/slides/slide1.xml", options).unwrap();
    let slide = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
  <p:cSld><p:spTree>
    <p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>
    <p:grpSpPr/>{shapes}
  </p:spTree></p:cSld>
</p:sld>"#
    );
    zip.write_all(slide.as_bytes()).unwrap();

    zip.finish().unwrap();
    buffer.into_inner()
}

fn write_presentation(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("launch.pptx");
    fs::write(&path, create_test_presentation()).unwrap();
    path
}

fn write_table_presentation(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("milestones.pptx");
    let shapes = format!("{}{}", TITLE_AND_TEXT, MILESTONE_TABLE);
    fs::write(&path, build_presentation(&shapes)).unwrap();
    path
}

fn opts() -> Options<'static> {
    Options::default()
}

fn parse(json: &str) -> Value {
    serde_json::from_str(json).expect("command output is JSON")
}

#[test]
fn test_extract_command() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input = write_presentation(&temp_dir);

    let output = parse(&extract_command(&input, &opts()).unwrap());
    assert!(output["archive"].as_str().unwrap().ends_with("launch.pptx"));
    assert_eq!(output["warnings"], json!([]));

    let result = &output["result"];
    assert_eq!(result["slide_count"], json!(1));
    assert_eq!(result["title"], json!("Launch Plan"));
    assert_eq!(result["slides"][0]["shapes"][1]["shape_type"], json!("text_box"));
    assert_eq!(result["slides"][0]["shapes"][1]["text"], json!("Ship by Friday"));
}

#[test]
fn test_attributes_command() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input = write_presentation(&temp_dir);

    let output = parse(
        &attributes_command(&input, &opts(), &["slide_size".to_string(), "text".to_string()])
            .unwrap(),
    );
    let result = &output["result"];
    assert_eq!(result["slide_size"]["width_inches"], json!(10.0));
    assert_eq!(result["slides"][0]["text"], json!(["Launch Plan", "Ship by Friday"]));

    let err = attributes_command(&input, &opts(), &["fonts".to_string()]).unwrap_err();
    assert!(format!("{:#}", err).contains("fonts"));
}

#[test]
fn test_slide_command() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input = write_presentation(&temp_dir);

    let output = parse(&slide_command(&input, &opts(), 1).unwrap());
    assert_eq!(output["result"]["slide_id"], json!(256));

    let err = slide_command(&input, &opts(), 2).unwrap_err();
    assert!(format!("{:#}", err).contains("out of range"));
}

#[test]
fn test_formatted_command() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input = write_presentation(&temp_dir);

    let output = parse(&formatted_command(&input, &opts(), "bold", &[]).unwrap());
    let result = &output["result"];
    assert_eq!(result["match_count"], json!(1));
    assert_eq!(result["matches"][0]["text"], json!("Friday"));
    assert_eq!(result["matches"][0]["shape_name"], json!("TextBox 2"));

    assert!(formatted_command(&input, &opts(), "bold+", &[]).is_err());
}

#[test]
fn test_overview_command() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input = write_presentation(&temp_dir);

    let summary = parse(&overview_command(&input, &opts(), "summary").unwrap());
    assert_eq!(summary["result"]["slide_count"], json!(1));
    assert!(summary["result"].get("slides").is_none());

    let detailed = parse(&overview_command(&input, &opts(), "detailed").unwrap());
    assert_eq!(detailed["result"]["slides"][0]["text"]["words"], json!(5));
}

#[test]
fn test_config_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input = write_presentation(&temp_dir);

    let config = temp_dir.path().join("slidequery.toml");
    let with_config = Options {
        config: Some(config.as_path()),
        ..Default::default()
    };
    fs::write(&config, "[build]\nparallel = false\n").unwrap();
    let output = parse(&extract_command(&input, &with_config).unwrap());
    assert_eq!(output["result"]["slide_count"], json!(1));

    fs::write(&config, "[build]\nparallel = \"sometimes\"\n").unwrap();
    let err = extract_command(&input, &with_config).unwrap_err();
    assert!(err.to_string().contains("Failed to load configuration"));
}

#[test]
fn test_not_a_presentation() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input = temp_dir.path().join("notes.pptx");
    fs::write(&input, "just some text").unwrap();

    let err = extract_command(&input, &opts()).unwrap_err();
    assert!(err.to_string().contains("Failed to open presentation"));
}

#[test]
fn test_compact_output() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input = write_presentation(&temp_dir);

    let compact = Options {
        compact: true,
        ..Default::default()
    };
    let single_line = overview_command(&input, &compact, "detailed").unwrap();
    let pretty = overview_command(&input, &opts(), "detailed").unwrap();

    assert!(!single_line.contains('\n'));
    assert!(pretty.contains('\n'));
    assert_eq!(parse(&single_line), parse(&pretty));
}

#[test]
fn test_formatted_command_slide_filter() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input = write_presentation(&temp_dir);

    let output = parse(&formatted_command(&input, &opts(), "bold", &[1]).unwrap());
    let slide = &output["result"]["by_slide"][0];
    assert_eq!(slide["complete_text"], json!("Launch Plan\nShip by Friday"));
    assert_eq!(slide["segments"][0]["start_position"], json!(20));

    let err = formatted_command(&input, &opts(), "bold", &[2]).unwrap_err();
    assert!(format!("{:#}", err).contains("out of range"));
}

#[test]
fn test_analyze_command() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input = write_presentation(&temp_dir);

    let output = parse(&analyze_command(&input, &opts(), &[]).unwrap());
    let result = &output["result"];
    assert_eq!(result["slides_analyzed"], json!(1));
    assert_eq!(result["total_runs"], json!(3));
    assert_eq!(result["counts"]["bold"], json!(1));
}

#[test]
fn test_query_command() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input = write_table_presentation(&temp_dir);

    let output = parse(
        &query_command(
            &input,
            &opts(),
            Some(r#"{"title": {"starts_with": "launch"}, "content": {"has_tables": true}}"#),
            &["title".to_string(), "table_info".to_string()],
            10,
        )
        .unwrap(),
    );
    let result = &output["result"];
    assert_eq!(result["total_matches"], json!(1));
    assert_eq!(result["slides"][0]["title"], json!("Launch Plan"));
    assert_eq!(result["slides"][0]["table_info"][0]["headers"], json!(["Task", "Owner"]));

    let none = parse(
        &query_command(&input, &opts(), Some(r#"{"content": {"has_images": true}}"#), &[], 10)
            .unwrap(),
    );
    assert_eq!(none["result"]["total_matches"], json!(0));
    assert_eq!(none["result"]["slides"], json!([]));
}

#[test]
fn test_tables_command() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let input = write_table_presentation(&temp_dir);

    let structured = parse(
        &tables_command(&input, &opts(), &[], None, None, "structured", true).unwrap(),
    );
    let result = &structured["result"];
    assert_eq!(result["format"], json!("structured"));
    assert_eq!(result["summary"]["total_tables"], json!(1));
    assert_eq!(result["summary"]["formatting_found"]["bold_cells"], json!(1));
    assert_eq!(result["tables"][0]["data"][0][0]["value"], json!("Beta"));

    let flat = parse(
        &tables_command(
            &input,
            &opts(),
            &[1],
            Some(r#"{"header_contains": ["owner"]}"#),
            Some(r#"{"exclude_columns": ["Task"]}"#),
            "flat",
            false,
        )
        .unwrap(),
    );
    assert_eq!(
        flat["result"]["tables"],
        json!([{"slide_number": 1, "table_index": 0, "row_index": 0, "Owner": "Dana"}])
    );

    let err = tables_command(&input, &opts(), &[], Some(r#"{"min_rows": "two"}"#), None, "flat", true)
        .unwrap_err();
    assert!(err.to_string().contains("Invalid table criteria"));
}
