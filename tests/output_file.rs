mod common;

use std::{fs, path::PathBuf};

use plotbridge::{
    output::NoVariables, ImageFormat, OutputFileWriter, PlotError, RenderedImage,
    ScriptParameters, TemplateContext, VariableMap,
};

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

fn ctx(workspace: Option<PathBuf>) -> TemplateContext {
    TemplateContext { date: "261019".into(), user: Some("alice".into()), workspace }
}

fn image() -> RenderedImage {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("src.png");
    common::write_png(&path, 4, 3);
    RenderedImage::decode_file(&path).unwrap()
}

fn params(template: String) -> ScriptParameters {
    ScriptParameters { output_path_template: template, ..ScriptParameters::default() }
}

#[test]
fn existing_destination_without_overwrite_is_a_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("plot.png");
    fs::write(&dest, b"precious bytes").unwrap();

    let writer = OutputFileWriter::new(ctx(None));
    let err = writer
        .write(&params(dest.to_string_lossy().into_owned()), &image(), &NoVariables)
        .unwrap_err();

    assert!(matches!(err, PlotError::Conflict { .. }));
    assert_eq!(fs::read(&dest).unwrap(), b"precious bytes");
}

#[test]
fn overwrite_replaces_existing_destination() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("plot.png");
    fs::write(&dest, b"old").unwrap();

    let mut p = params(dest.to_string_lossy().into_owned());
    p.overwrite = true;
    let written = OutputFileWriter::new(ctx(None)).write(&p, &image(), &NoVariables).unwrap();

    assert_eq!(written.as_deref(), Some(dest.as_path()));
    assert!(fs::read(&dest).unwrap().starts_with(PNG_MAGIC));
}

#[test]
fn disabled_or_empty_destination_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("plot.png");
    let writer = OutputFileWriter::new(ctx(None));

    let mut p = params(dest.to_string_lossy().into_owned());
    p.write_to_file = false;
    assert_eq!(writer.write(&p, &image(), &NoVariables).unwrap(), None);
    assert!(!dest.exists());

    assert_eq!(writer.write(&params(String::new()), &image(), &NoVariables).unwrap(), None);

    let blank = |_: &str| -> plotbridge::Result<String> { Ok(String::new()) };
    assert_eq!(writer.write(&params("${x}".into()), &image(), &blank).unwrap(), None);
}

#[test]
fn templated_name_is_resolved() {
    let dir = tempfile::tempdir().unwrap();
    let writer = OutputFileWriter::new(ctx(Some(dir.path().to_path_buf())));

    let written = writer
        .write(&params("$$WS$$/plot_$$DATE$$_$$USER$$.png".into()), &image(), &NoVariables)
        .unwrap()
        .unwrap();

    assert_eq!(written, dir.path().join("plot_261019_alice.png"));
    let name = written.file_name().unwrap().to_string_lossy().into_owned();
    assert!(!name.contains("$$"));
    assert!(written.exists());
}

#[test]
fn host_variables_feed_the_destination() {
    let dir = tempfile::tempdir().unwrap();
    let mut vars = VariableMap::new();
    vars.insert("outdir", dir.path().to_string_lossy());

    let written = OutputFileWriter::new(ctx(None))
        .write(&params("${outdir}/fig.png".into()), &image(), &vars)
        .unwrap();
    assert_eq!(written, Some(dir.path().join("fig.png")));
}

#[test]
fn workspace_token_without_workspace_fails_without_writing() {
    let writer = OutputFileWriter::new(ctx(None));
    let err = writer
        .write(&params("$$WS$$/plot.png".into()), &image(), &NoVariables)
        .unwrap_err();
    assert!(matches!(err, PlotError::Configuration(_)));
}

#[test]
fn non_png_formats_are_still_written_as_png() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("plot.pdf");
    let mut p = params(dest.to_string_lossy().into_owned());
    p.image_format = ImageFormat::Pdf;

    OutputFileWriter::new(ctx(None)).write(&p, &image(), &NoVariables).unwrap();
    assert!(fs::read(&dest).unwrap().starts_with(PNG_MAGIC));
}

#[test]
fn user_token_without_known_user_fails_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let writer = OutputFileWriter::new(TemplateContext { user: None, ..ctx(None) });

    let template = format!("{}/plot_$$USER$$.png", dir.path().display());
    let err = writer.write(&params(template), &image(), &NoVariables).unwrap_err();

    assert!(matches!(err, PlotError::Configuration(_)));
    assert!(common::dir_entries(dir.path()).is_empty());
}

#[test]
fn current_context_is_read_at_export_time() {
    let dir = tempfile::tempdir().unwrap();
    let writer = OutputFileWriter::current(Some(dir.path().to_path_buf()));

    let written = writer
        .write(&params("$$WS$$/plot_$$DATE$$.png".into()), &image(), &NoVariables)
        .unwrap()
        .unwrap();

    let today = chrono::Local::now().format("%y%m%d").to_string();
    assert_eq!(written, dir.path().join(format!("plot_{today}.png")));
}
