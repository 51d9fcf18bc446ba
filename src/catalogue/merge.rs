use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;

use super::item::{Catalogue, PracticeItem};

const REQUIRED_HEADERS: &[&str] = &[
    "date",
    "set",
    "num",
    "timeSec",
    "scene",
    "prompt",
    "audio",
    "picture",
    "script",
    "type",
    "length",
    "difficulty",
];

const ALLOWED_KINDS: &[&str] = &["simple", "compound", "complex"];

#[derive(Debug, Clone, Copy)]
pub struct MergeReport {
    pub base_items: usize,
    pub new_items: usize,
    pub merged_items: usize,
}

/// Reconcile a base catalogue JSON with new rows from a TSV export.
///
/// New rows are validated (required columns, kind, difficulty range, unique
/// ids against both the base and each other), appended, sorted by (set, num),
/// and written to `out_path`. The base file is never modified.
pub fn merge_catalogue(
    base_path: impl AsRef<Path>,
    tsv_path: impl AsRef<Path>,
    out_path: impl AsRef<Path>,
) -> Result<MergeReport> {
    let base_path = base_path.as_ref();
    let raw = fs::read_to_string(base_path)
        .with_context(|| format!("Failed to read {}", base_path.display()))?;
    let mut catalogue: Catalogue =
        serde_json::from_str(&raw).context("Base catalogue is not valid JSON")?;

    let rows = read_tsv_rows(tsv_path.as_ref())?;
    if rows.is_empty() {
        bail!("TSV file is empty");
    }

    let header = &rows[0];
    let column = |name: &str| -> Result<usize> {
        header
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("Missing required column in TSV: {}", name))
    };
    for name in REQUIRED_HEADERS {
        column(name)?;
    }

    let existing_ids: HashSet<String> = catalogue.items.iter().map(|i| i.id.clone()).collect();
    let mut new_ids: HashSet<String> = HashSet::new();
    let mut new_items: Vec<PracticeItem> = Vec::new();

    for (i, row) in rows.iter().enumerate().skip(1) {
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let row_num = i + 1;

        let cell = |name: &str| -> Result<&str> {
            let idx = column(name)?;
            Ok(row.get(idx).map(String::as_str).unwrap_or(""))
        };
        let number = |name: &str| -> Result<f64> {
            let raw = cell(name)?.trim();
            if raw.is_empty() {
                bail!("Empty value at row {}, column {}", row_num, name);
            }
            raw.parse::<f64>()
                .with_context(|| format!("NaN value at row {}, column {}", row_num, name))
        };

        let date = number("date")? as i64;
        let set = cell("set")?.trim().to_string();
        let num = number("num")? as i64;
        let time_secs = number("timeSec")?;
        let length = number("length")?;
        let difficulty = number("difficulty")?;
        let kind = cell("type")?.trim().to_string();
        let audio = cell("audio")?.trim().to_string();

        if !ALLOWED_KINDS.contains(&kind.as_str()) {
            bail!("Invalid type at row {}: {}", row_num, kind);
        }
        if difficulty.fract() != 0.0 || !(1.0..=5.0).contains(&difficulty) {
            bail!("Invalid difficulty at row {}: {}", row_num, difficulty);
        }

        let id = id_from_audio(&audio).unwrap_or_else(|| format!("{}-{:02}", set, num));

        if existing_ids.contains(&id) {
            bail!("Duplicate id vs original at row {}: {}", row_num, id);
        }
        if !new_ids.insert(id.clone()) {
            bail!("Duplicate id within new rows at row {}: {}", row_num, id);
        }

        new_items.push(PracticeItem {
            id,
            date,
            set,
            num,
            time_secs,
            scene: cell("scene")?.trim().to_string(),
            kind,
            length,
            difficulty: difficulty as i64,
            prompt: cell("prompt")?.trim().to_string(),
            script: cell("script")?.trim().to_string(),
            audio,
            picture: cell("picture")?.trim().to_string(),
        });
    }

    let report = MergeReport {
        base_items: catalogue.items.len(),
        new_items: new_items.len(),
        merged_items: catalogue.items.len() + new_items.len(),
    };

    catalogue.items.extend(new_items);
    catalogue
        .items
        .sort_by(|a, b| a.set.cmp(&b.set).then(a.num.cmp(&b.num)));
    catalogue.version = chrono::Utc::now().to_rfc3339();
    catalogue.source = format!(
        "{} + {} merged",
        base_path.display(),
        tsv_path.as_ref().display()
    );

    let out_path = out_path.as_ref();
    fs::write(out_path, serde_json::to_vec_pretty(&catalogue)?)
        .with_context(|| format!("Failed to write {}", out_path.display()))?;

    info!(
        "Merged catalogue: {} base + {} new -> {} ({})",
        report.base_items,
        report.new_items,
        report.merged_items,
        out_path.display()
    );

    Ok(report)
}

fn read_tsv_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(raw
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split('\t').map(|cell| cell.to_string()).collect())
        .collect())
}

/// Derive an item id from the audio filename, stripping the extension.
fn id_from_audio(audio: &str) -> Option<String> {
    let trimmed = audio.trim();
    if trimmed.is_empty() {
        return None;
    }
    let stem = match trimmed.rfind('.') {
        Some(dot) if dot > 0 && !trimmed[dot + 1..].contains('/') => &trimmed[..dot],
        _ => trimmed,
    };
    Some(stem.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_comes_from_audio_stem() {
        assert_eq!(id_from_audio("20240101_01_03.mp3"), Some("20240101_01_03".into()));
        assert_eq!(id_from_audio("  "), None);
        assert_eq!(id_from_audio("noext"), Some("noext".into()));
    }
}
