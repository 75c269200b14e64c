//! Factbridge CLI: thin caller around the extraction/reconciliation core.
//!
//! Loads filings (from a manifest or by scanning a directory of saved
//! instance documents), loads per-entity vendor statements, runs the batch,
//! and writes the mapping table plus the audit report. No algorithmic
//! content lives here.

use anyhow::{bail, Context as _, Result};
use chrono::NaiveDate;
use clap::Parser;
use factbridge_recon::{
    render_audit, run_batch, BatchOptions, FilingDocument, MappingPolicy, VendorStatements,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Parser)]
#[command(
    name = "factbridge",
    about = "Infer vendor-label -> XBRL-concept mappings from saved filings"
)]
struct Cli {
    /// Filings manifest JSON ({"filings": [{ticker, accession_number, form,
    /// filing_date, instance_path}, ...]}). Paths are relative to the
    /// manifest file.
    #[arg(long, conflicts_with = "filings_dir")]
    manifest: Option<PathBuf>,

    /// Alternative to --manifest: scan a directory for files named
    /// TICKER_ACCESSION_FORM_instance.xml (the raw-XBRL archive layout).
    #[arg(long)]
    filings_dir: Option<PathBuf>,

    /// Directory of per-entity vendor statements, one TICKER.json each.
    #[arg(long)]
    vendor_dir: Option<PathBuf>,

    /// Output directory for mapping.json and audit.txt.
    #[arg(long, default_value = "out")]
    out: PathBuf,

    /// Keep only filings whose form starts with this prefix.
    #[arg(long, default_value = "10-Q")]
    form: String,

    /// Max canonical rows per document; 0 means unlimited.
    #[arg(long, default_value_t = 500)]
    fact_limit: usize,

    /// Minimum evidence samples for an accepted mapping.
    #[arg(long, default_value_t = 3)]
    min_samples: usize,

    /// Maximum mean relative error for an accepted mapping (0.02 = 2%).
    #[arg(long, default_value_t = 0.02)]
    max_mean_error: f64,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    filings: Vec<ManifestFiling>,
}

#[derive(Debug, Deserialize)]
struct ManifestFiling {
    ticker: String,
    accession_number: String,
    #[serde(default)]
    form: Option<String>,
    #[serde(default)]
    filing_date: Option<NaiveDate>,
    instance_path: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let documents = match (&cli.manifest, &cli.filings_dir) {
        (Some(manifest), None) => load_from_manifest(manifest)?,
        (None, Some(dir)) => load_from_directory(dir)?,
        (None, None) => bail!("either --manifest or --filings-dir is required"),
        (Some(_), Some(_)) => unreachable!("clap conflicts_with"),
    };
    if documents.is_empty() {
        bail!("no filings to process");
    }
    tracing::info!(count = documents.len(), "loaded filings");

    let vendor = match &cli.vendor_dir {
        Some(dir) => load_vendor_statements(dir, &documents)?,
        None => BTreeMap::new(),
    };
    tracing::info!(entities = vendor.len(), "loaded vendor statements");

    let options = BatchOptions {
        policy: MappingPolicy {
            min_samples: cli.min_samples,
            max_mean_error: cli.max_mean_error,
            ..MappingPolicy::default()
        },
        fact_limit: (cli.fact_limit > 0).then_some(cli.fact_limit),
        form_prefix: (!cli.form.is_empty()).then(|| cli.form.clone()),
    };

    let outcome = run_batch(documents, &vendor, &options);

    let skipped = outcome
        .reports
        .iter()
        .filter(|r| matches!(r.status, factbridge_recon::DocumentStatus::Skipped { .. }))
        .count();
    tracing::info!(
        documents = outcome.reports.len(),
        skipped,
        mapped_entities = outcome.mapping.table.len(),
        "batch finished"
    );

    fs::create_dir_all(&cli.out)
        .with_context(|| format!("creating output dir {}", cli.out.display()))?;

    let mapping_path = cli.out.join("mapping.json");
    fs::write(
        &mapping_path,
        serde_json::to_string_pretty(&outcome.mapping.table)?,
    )?;

    let audit_path = cli.out.join("audit.txt");
    fs::write(&audit_path, render_audit(&outcome.mapping.audits))?;

    let reports_path = cli.out.join("reports.json");
    fs::write(&reports_path, serde_json::to_string_pretty(&outcome.reports)?)?;

    tracing::info!(
        mapping = %mapping_path.display(),
        audit = %audit_path.display(),
        "results written"
    );
    Ok(())
}

fn load_from_manifest(path: &Path) -> Result<Vec<FilingDocument>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading manifest {}", path.display()))?;
    let manifest: Manifest = serde_json::from_str(&text)
        .with_context(|| format!("parsing manifest {}", path.display()))?;
    let base = path.parent().unwrap_or(Path::new("."));

    let mut documents = Vec::new();
    for filing in manifest.filings {
        let instance_path = base.join(&filing.instance_path);
        let xml = match fs::read_to_string(&instance_path) {
            Ok(xml) => xml,
            Err(err) => {
                tracing::warn!(
                    path = %instance_path.display(),
                    %err,
                    "cannot read instance document, skipping filing"
                );
                continue;
            }
        };
        documents.push(FilingDocument {
            entity: filing.ticker.to_uppercase(),
            document_id: filing.accession_number,
            form: filing.form,
            filing_date: filing
                .filing_date
                .unwrap_or_else(|| chrono::Local::now().date_naive()),
            xml,
        });
    }
    Ok(documents)
}

/// Archive layout: TICKER_ACCESSION_FORM_instance.xml, any depth. Form and
/// filing date are best-effort here; prefer a manifest when available.
fn load_from_directory(dir: &Path) -> Result<Vec<FilingDocument>> {
    let mut documents = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !name.ends_with("_instance.xml") {
            continue;
        }
        let stem = name.trim_end_matches("_instance.xml");
        let mut parts = stem.splitn(3, '_');
        let (Some(ticker), Some(accession)) = (parts.next(), parts.next()) else {
            tracing::warn!(file = %name, "unrecognized instance filename, skipping");
            continue;
        };
        let form = parts.next().map(str::to_string);

        let xml = fs::read_to_string(entry.path())
            .with_context(|| format!("reading {}", entry.path().display()))?;
        documents.push(FilingDocument {
            entity: ticker.to_uppercase(),
            document_id: accession.to_string(),
            form,
            filing_date: chrono::Local::now().date_naive(),
            xml,
        });
    }
    Ok(documents)
}

fn load_vendor_statements(
    dir: &Path,
    documents: &[FilingDocument],
) -> Result<BTreeMap<String, VendorStatements>> {
    let mut out = BTreeMap::new();
    for doc in documents {
        if out.contains_key(&doc.entity) {
            continue;
        }
        let path = dir.join(format!("{}.json", doc.entity));
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(_) => {
                tracing::warn!(entity = doc.entity.as_str(), path = %path.display(),
                    "no vendor statements for entity");
                continue;
            }
        };
        let statements: VendorStatements = serde_json::from_str(&text)
            .with_context(|| format!("parsing vendor statements {}", path.display()))?;
        out.insert(doc.entity.clone(), statements);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = fs::File::create(&path).expect("create file");
        f.write_all(contents.as_bytes()).expect("write file");
        path
    }

    const TINY_XML: &str = r#"<xbrl xmlns="http://www.xbrl.org/2003/instance">
  <context id="c"><period><instant>2024-09-30</instant></period></context>
</xbrl>"#;

    #[test]
    fn manifest_loading_skips_unreadable_instances() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_file(tmp.path(), "acme.xml", TINY_XML);
        let manifest = write_file(
            tmp.path(),
            "manifest.json",
            r#"{"filings": [
                {"ticker": "acme", "accession_number": "0001", "form": "10-Q",
                 "filing_date": "2024-11-01", "instance_path": "acme.xml"},
                {"ticker": "gone", "accession_number": "0002",
                 "instance_path": "missing.xml"}
            ]}"#,
        );

        let docs = load_from_manifest(&manifest).expect("load");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].entity, "ACME");
        assert_eq!(docs[0].document_id, "0001");
        assert_eq!(docs[0].form.as_deref(), Some("10-Q"));
    }

    #[test]
    fn directory_loading_parses_archive_filenames() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_file(tmp.path(), "ACME_0001_10-Q_instance.xml", TINY_XML);
        write_file(tmp.path(), "notes.txt", "ignored");

        let docs = load_from_directory(tmp.path()).expect("load");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].entity, "ACME");
        assert_eq!(docs[0].document_id, "0001");
        assert_eq!(docs[0].form.as_deref(), Some("10-Q"));
    }
}
