//! Filesystem persistence

use appforge::artifacts::ManifestBuilder;
use appforge::types::{
    ArtifactKind, ArtifactSpec, ChecklistItem, ChecklistSource, GeneratedArtifact,
    ProjectDocuments,
};
use appforge::{Bundle, FsStore, PersistenceStore, StoreError};
use appforge_sdk::RunId;
use tempfile::TempDir;

fn bundle(header_text: &str) -> Bundle {
    let artifacts = vec![
        GeneratedArtifact::from_spec(
            &ArtifactSpec::new("Header", ArtifactKind::Navigation),
            format!("function Header() {{ return <h1>{}</h1>; }}\nwindow.Header = Header;\n", header_text),
            Vec::new(),
        ),
        GeneratedArtifact::from_spec(
            &ArtifactSpec::container("App"),
            "function App() { return <div />; }\nwindow.App = App;\n".to_string(),
            Vec::new(),
        ),
    ];
    ManifestBuilder::new("Recipes", "App")
        .build(artifacts, &[])
        .unwrap()
        .with_documents(ProjectDocuments {
            title: "Recipes".into(),
            description: "Family recipes".into(),
            requirements: "# Recipes\n".into(),
            checklist: vec![ChecklistItem {
                title: "Recipe list".into(),
                detail: None,
                done: false,
                source: ChecklistSource::Requirements,
            }],
            notes: None,
        })
}

#[tokio::test]
async fn test_round_trip_writes_every_file() {
    let dir = TempDir::new().unwrap();
    let store = FsStore::new(dir.path());
    let run_id = RunId::new();
    let saved = bundle("Recipes");

    store.save(run_id, &saved).await.unwrap();
    let loaded = store.load(run_id).await.unwrap();
    assert_eq!(loaded, saved);

    let run_dir = store.run_dir(run_id);
    for artifact in &saved.artifacts {
        let on_disk = std::fs::read_to_string(run_dir.join(&artifact.filename)).unwrap();
        assert_eq!(on_disk, artifact.content);
    }
    assert!(run_dir.join("index.html").exists());
    assert_eq!(
        std::fs::read_to_string(run_dir.join("requirements.md")).unwrap(),
        "# Recipes\n"
    );

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with(".staging"))
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn test_unknown_run_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = FsStore::new(dir.path());
    let err = store.load(RunId::new()).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn test_saving_again_replaces_the_run() {
    let dir = TempDir::new().unwrap();
    let store = FsStore::new(dir.path());
    let run_id = RunId::new();

    store.save(run_id, &bundle("First")).await.unwrap();
    store.save(run_id, &bundle("Second")).await.unwrap();

    let loaded = store.load(run_id).await.unwrap();
    let header = loaded.artifact_named("Header").unwrap();
    assert!(header.content.contains("Second"));
    assert!(!header.content.contains("First"));
}
