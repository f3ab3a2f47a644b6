//! Filesystem fetcher integration tests

use serde_json::json;
use spacey_loader::{FsBundleFetcher, LoaderConfig, LoaderError, ModuleLoader};
use std::fs;
use tempfile::TempDir;

fn write_bundle(dir: &TempDir, name: &str, body: serde_json::Value) {
    fs::write(dir.path().join(name), serde_json::to_string_pretty(&body).unwrap()).unwrap();
}

#[tokio::test]
async fn test_loads_modules_from_manifests() {
    let dir = TempDir::new().unwrap();
    write_bundle(
        &dir,
        "vendor.json",
        json!({
            "modules": [
                { "id": "@acme/util@1.0.0/index.js", "exports": { "version": "1.0.0" } },
                { "id": "@acme/util@1.4.2/index.js", "exports": { "version": "1.4.2" } }
            ]
        }),
    );
    write_bundle(
        &dir,
        "app.json",
        json!({
            "modules": [{
                "id": "app@0.1.0/main.js",
                "requires": ["@acme/util@^1.0.0/index.js"],
                "exports": { "title": "demo" }
            }]
        }),
    );

    let loader = ModuleLoader::new(FsBundleFetcher::new(dir.path()));
    let require = loader
        .require_bundles(["vendor.json", "app.json"])
        .await
        .unwrap();

    let app = require.require("app@0.1.0/main.js").unwrap();
    assert_eq!(app.to_json(), json!({ "title": "demo" }));

    // The dependency was instantiated while the app module ran
    let ids = loader.instantiated_ids();
    assert_eq!(ids, vec!["@acme/util@1.4.2/index.js", "app@0.1.0/main.js"]);
    let util = require.require("@acme/util@^1.0.0/index.js").unwrap();
    assert_eq!(util.to_json(), json!({ "version": "1.4.2" }));
}

#[tokio::test]
async fn test_missing_dependency_is_a_factory_error() {
    let dir = TempDir::new().unwrap();
    write_bundle(
        &dir,
        "app.json",
        json!({ "modules": [{ "id": "app@1.0.0", "requires": ["ghost@^1.0.0"] }] }),
    );

    let loader = ModuleLoader::new(FsBundleFetcher::new(dir.path()));
    let require = loader.require_bundles(["app.json"]).await.unwrap();

    let err = require.require("app@1.0.0").unwrap_err();
    assert!(matches!(err, LoaderError::Factory(_)));
    assert!(format!("{err:#}").contains("ghost@^1.0.0"));
}

#[tokio::test]
async fn test_unreadable_bundles_fail() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

    let loader = ModuleLoader::new(FsBundleFetcher::new(dir.path()));

    let err = loader.require_bundles(["broken.json"]).await.unwrap_err();
    assert!(matches!(err, LoaderError::Bundle(ref b) if b.path == "broken.json"));

    let err = loader.require_bundles(["absent.json"]).await.unwrap_err();
    assert!(matches!(err, LoaderError::Bundle(_)));

    let err = loader.require_bundles(["../escape.json"]).await.unwrap_err();
    assert!(err.to_string().contains("leaves the bundle root"));
}

#[tokio::test]
async fn test_strict_config_rejects_lone_mismatch() {
    let dir = TempDir::new().unwrap();
    write_bundle(&dir, "one.json", json!({ "modules": [{ "id": "solo@1.0.0" }] }));

    let config = LoaderConfig {
        single_candidate_shortcut: false,
        ..LoaderConfig::default()
    };
    let loader = ModuleLoader::with_config(config, FsBundleFetcher::new(dir.path()));
    let require = loader.require_bundles(["one.json"]).await.unwrap();

    assert!(require.require("solo@^1.0.0").is_ok());
    assert!(matches!(
        require.require("solo@^2.0.0"),
        Err(LoaderError::Resolution(_))
    ));
}
