// Integration tests for catalogue loading (primary -> cache -> import
// fallback chain), selection, and the TSV merge utility.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use speakdrill::catalogue::{
    merge_catalogue, select_items, Catalogue, CatalogueLoader, CatalogueSource, PracticeItem,
};
use tempfile::TempDir;

fn item_json(id: &str, set: &str, num: i64, time_secs: f64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "date": 20240101,
        "set": set,
        "num": num,
        "timeSec": time_secs,
        "scene": "cafe",
        "type": "simple",
        "length": 8.0,
        "difficulty": 2,
        "prompt": "Describe the scene.",
        "script": "",
        "audio": format!("{}.mp3", id),
        "picture": ""
    })
}

fn write_catalogue(path: &Path, items: Vec<serde_json::Value>) {
    let doc = serde_json::json!({ "version": "test", "source": "test", "items": items });
    fs::write(path, serde_json::to_vec_pretty(&doc).unwrap()).unwrap();
}

fn paths(tmp: &TempDir) -> (PathBuf, PathBuf) {
    (
        tmp.path().join("TestData.json"),
        tmp.path().join("cache.json"),
    )
}

#[test]
fn primary_load_refreshes_the_cache() -> Result<()> {
    let tmp = TempDir::new()?;
    let (primary, cache) = paths(&tmp);
    write_catalogue(&primary, vec![item_json("a", "A", 1, 30.0)]);

    let loaded = CatalogueLoader::new(&primary, &cache)
        .load()?
        .expect("primary exists");
    assert_eq!(loaded.source, CatalogueSource::Primary);
    assert_eq!(loaded.items.len(), 1);
    assert!(cache.exists(), "cache written as a side effect");

    Ok(())
}

#[test]
fn missing_primary_falls_back_to_the_cache() -> Result<()> {
    let tmp = TempDir::new()?;
    let (primary, cache) = paths(&tmp);
    write_catalogue(&primary, vec![item_json("a", "A", 1, 30.0)]);

    let loader = CatalogueLoader::new(&primary, &cache);
    loader.load()?;
    fs::remove_file(&primary)?;

    let loaded = loader.load()?.expect("cache exists");
    assert_eq!(loaded.source, CatalogueSource::Cache);
    assert_eq!(loaded.items[0].id, "a");

    Ok(())
}

#[test]
fn stale_cache_is_discarded_and_an_import_is_required() -> Result<()> {
    let tmp = TempDir::new()?;
    let (primary, cache) = paths(&tmp);

    // Cached rows with an unusable duration are not trusted.
    write_catalogue(&cache, vec![item_json("a", "A", 1, 0.0)]);

    let loaded = CatalogueLoader::new(&primary, &cache).load()?;
    assert!(loaded.is_none(), "no primary and no usable cache");
    assert!(!cache.exists(), "stale cache is deleted");

    Ok(())
}

#[test]
fn legacy_shaped_cache_is_rejected() -> Result<()> {
    let tmp = TempDir::new()?;
    let (primary, cache) = paths(&tmp);

    let legacy = serde_json::json!({ "items": [{
        "id": "a", "Date": 20240101, "set": "A", "num": 1, "Time/s": 30
    }]});
    fs::write(&cache, serde_json::to_vec(&legacy)?)?;

    let loaded = CatalogueLoader::new(&primary, &cache).load()?;
    assert!(loaded.is_none());
    assert!(!cache.exists());

    Ok(())
}

#[test]
fn fresh_data_with_a_bad_duration_still_loads() -> Result<()> {
    let tmp = TempDir::new()?;
    let (primary, cache) = paths(&tmp);

    // Duration validity is the session's per-item concern, not the loader's.
    write_catalogue(
        &primary,
        vec![item_json("a", "A", 1, 3.0), item_json("b", "A", 2, 0.0)],
    );

    let loaded = CatalogueLoader::new(&primary, &cache)
        .load()?
        .expect("primary exists");
    assert_eq!(loaded.items.len(), 2);
    assert!(!loaded.items[1].has_valid_duration());

    Ok(())
}

#[test]
fn import_loads_and_refreshes_the_cache() -> Result<()> {
    let tmp = TempDir::new()?;
    let (primary, cache) = paths(&tmp);
    let supplied = tmp.path().join("upload.json");
    write_catalogue(&supplied, vec![item_json("a", "A", 1, 30.0)]);

    let loader = CatalogueLoader::new(&primary, &cache);
    let loaded = loader.import(&supplied)?;
    assert_eq!(loaded.source, CatalogueSource::Import);
    assert!(cache.exists());

    // Next startup finds the cache even though the primary never existed.
    let reloaded = loader.load()?.expect("cache from import");
    assert_eq!(reloaded.source, CatalogueSource::Cache);

    Ok(())
}

#[test]
fn selection_preserves_catalogue_order_and_drops_unknown_ids() {
    let items: Vec<PracticeItem> = serde_json::from_value(serde_json::Value::Array(vec![
        item_json("a", "A", 1, 30.0),
        item_json("b", "A", 2, 30.0),
        item_json("c", "B", 1, 30.0),
    ]))
    .unwrap();

    let selected = select_items(
        &items,
        &["c".to_string(), "a".to_string(), "ghost".to_string()],
    );
    let ids: Vec<&str> = selected.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c"]);
}

const TSV_HEADER: &str =
    "date\tset\tnum\ttimeSec\tscene\tprompt\taudio\tpicture\tscript\ttype\tlength\tdifficulty";

fn merge_fixture(tmp: &TempDir, tsv_body: &str) -> (PathBuf, PathBuf, PathBuf) {
    let base = tmp.path().join("base.json");
    write_catalogue(&base, vec![item_json("old", "A", 1, 30.0)]);
    let tsv = tmp.path().join("new.tsv");
    fs::write(&tsv, format!("{}\n{}", TSV_HEADER, tsv_body)).unwrap();
    let out = tmp.path().join("merged.json");
    (base, tsv, out)
}

#[test]
fn merge_appends_validates_and_sorts() -> Result<()> {
    let tmp = TempDir::new()?;
    let (base, tsv, out) = merge_fixture(
        &tmp,
        "20240201\tA\t3\t45\tpark\tDescribe.\tq3.mp3\t\t\tsimple\t8\t2\n\
         20240201\tA\t2\t45\tpark\tDescribe.\t\t\t\tcompound\t8\t3\n",
    );

    let report = merge_catalogue(&base, &tsv, &out)?;
    assert_eq!(report.base_items, 1);
    assert_eq!(report.new_items, 2);
    assert_eq!(report.merged_items, 3);

    let merged: Catalogue = serde_json::from_slice(&fs::read(&out)?)?;
    let ids: Vec<&str> = merged.items.iter().map(|i| i.id.as_str()).collect();
    // Sorted by (set, num): old (num 1), the audio-less row (A-02), q3.
    assert_eq!(ids, vec!["old", "A-02", "q3"]);
    assert!(!merged.version.is_empty());

    // The base file was not touched.
    let original: Catalogue = serde_json::from_slice(&fs::read(&base)?)?;
    assert_eq!(original.items.len(), 1);

    Ok(())
}

#[test]
fn merge_rejects_an_id_already_in_the_base() -> Result<()> {
    let tmp = TempDir::new()?;
    let (base, tsv, out) = merge_fixture(
        &tmp,
        "20240201\tA\t3\t45\tpark\tDescribe.\told.mp3\t\t\tsimple\t8\t2\n",
    );

    let err = merge_catalogue(&base, &tsv, &out).unwrap_err();
    assert!(err.to_string().contains("Duplicate id"));
    assert!(!out.exists());

    Ok(())
}

#[test]
fn merge_rejects_an_out_of_range_difficulty() -> Result<()> {
    let tmp = TempDir::new()?;
    let (base, tsv, out) = merge_fixture(
        &tmp,
        "20240201\tA\t3\t45\tpark\tDescribe.\tq3.mp3\t\t\tsimple\t8\t6\n",
    );

    let err = merge_catalogue(&base, &tsv, &out).unwrap_err();
    assert!(err.to_string().contains("Invalid difficulty"));

    Ok(())
}

#[test]
fn merge_rejects_an_unknown_kind() -> Result<()> {
    let tmp = TempDir::new()?;
    let (base, tsv, out) = merge_fixture(
        &tmp,
        "20240201\tA\t3\t45\tpark\tDescribe.\tq3.mp3\t\t\trun-on\t8\t2\n",
    );

    let err = merge_catalogue(&base, &tsv, &out).unwrap_err();
    assert!(err.to_string().contains("Invalid type"));

    Ok(())
}

#[test]
fn merge_requires_every_header() -> Result<()> {
    let tmp = TempDir::new()?;
    let base = tmp.path().join("base.json");
    write_catalogue(&base, vec![item_json("old", "A", 1, 30.0)]);
    let tsv = tmp.path().join("new.tsv");
    fs::write(&tsv, "date\tset\tnum\n20240201\tA\t3\n")?;
    let out = tmp.path().join("merged.json");

    let err = merge_catalogue(&base, &tsv, &out).unwrap_err();
    assert!(err.to_string().contains("Missing required column"));

    Ok(())
}
