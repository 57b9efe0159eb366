//! End-to-end lifecycle against a real local git origin: install a skill
//! from a repository, inspect it, pick up an upstream change, and remove it.

use git2::Repository;
use std::fs;
use std::path::Path;
use stratus_skills::{SkillError, SkillManager};
use tempfile::TempDir;

fn commit_all(repo: &Repository, message: &str) -> git2::Oid {
    let mut index = repo.index().unwrap();
    index.add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None).unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let sig = git2::Signature::now("tester", "tester@example.com").unwrap();

    let parent = repo
        .head()
        .ok()
        .and_then(|h| h.target())
        .and_then(|oid| repo.find_commit(oid).ok());
    let parents: Vec<_> = parent.iter().collect();

    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents).unwrap()
}

fn write_manifest(dir: &Path, description: &str) {
    fs::write(
        dir.join("SKILL.md"),
        format!(
            "---\nname: weather\ndescription: {description}\ntriggers:\n  keywords:\n    - forecast\n---\nFetch the forecast with the bundled script.\n"
        ),
    )
    .unwrap();
}

/// Origin repository holding one skill with a manifest and one script.
fn make_origin(dir: &Path) -> Repository {
    let repo = Repository::init(dir).unwrap();
    write_manifest(dir, "Weather lookups");
    fs::create_dir_all(dir.join("scripts")).unwrap();
    fs::write(dir.join("scripts/fetch.py"), "print('forecast')\n").unwrap();
    commit_all(&repo, "initial skill");
    repo
}

#[test]
fn test_install_list_info_update_remove() {
    let temp = TempDir::new().unwrap();
    let origin_dir = temp.path().join("origin");
    fs::create_dir_all(&origin_dir).unwrap();
    let origin = make_origin(&origin_dir);
    let origin_url = origin_dir.to_string_lossy().to_string();

    let manager = SkillManager::new(temp.path().join("skills"));

    // install
    let entries = manager.install(&origin_url, None, None, true).unwrap();
    assert_eq!(entries.len(), 1);
    let installed = &entries[0];
    assert_eq!(installed.canonical_name, "weather");
    assert!(installed.install_path.join("SKILL.md").exists());
    assert!(installed.install_path.join("scripts/fetch.py").exists());
    let first_revision = installed.revision.clone();
    assert_eq!(first_revision.len(), 40);

    // list
    let listed = manager.list();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].canonical_name, "weather");

    // info merges registry entry and a fresh manifest parse
    let info = manager.info("weather").unwrap();
    assert_eq!(info.description, "Weather lookups");
    assert_eq!(info.script_count, 1);
    assert_eq!(info.revision, first_revision);
    assert!(info.trusted);

    // a second install of the same skill is refused
    let err = manager.install(&origin_url, None, None, true).unwrap_err();
    assert!(matches!(err, SkillError::DuplicateName(_)));

    // upstream moves forward
    write_manifest(&origin_dir, "Weather lookups, now with radar");
    commit_all(&origin, "update description");

    // update repins to the new revision and picks up the new content
    let updated = manager.update("weather").unwrap();
    assert_ne!(updated.revision, first_revision);
    let info = manager.info("weather").unwrap();
    assert_eq!(info.description, "Weather lookups, now with radar");

    // remove deletes the directory and the registry entry
    let install_path = updated.install_path.clone();
    manager.remove("weather").unwrap();
    assert!(!install_path.exists());
    assert!(manager.list().is_empty());
    assert!(matches!(manager.info("weather"), Err(SkillError::NotFound(_))));
}

#[test]
fn test_untrusted_install_refused_before_clone() {
    let temp = TempDir::new().unwrap();
    let manager = SkillManager::new(temp.path().join("skills"));

    // the source does not even need to exist; the trust check comes first
    let err = manager
        .install("https://example.com/not-vetted.git", None, None, false)
        .unwrap_err();
    assert!(matches!(err, SkillError::Security(_)));
    assert!(manager.list().is_empty());
}

#[test]
fn test_install_from_branch() {
    let temp = TempDir::new().unwrap();
    let origin_dir = temp.path().join("origin");
    fs::create_dir_all(&origin_dir).unwrap();
    let origin = make_origin(&origin_dir);

    // create a branch with a different description
    {
        let default_ref = origin.head().unwrap().name().unwrap().to_string();
        let head = origin.head().unwrap().peel_to_commit().unwrap();
        origin.branch("radar", &head, false).unwrap();
        origin.set_head("refs/heads/radar").unwrap();
        origin.checkout_head(Some(git2::build::CheckoutBuilder::new().force())).unwrap();
        write_manifest(&origin_dir, "Radar branch build");
        commit_all(&origin, "branch work");
        origin.set_head(&default_ref).unwrap();
        origin.checkout_head(Some(git2::build::CheckoutBuilder::new().force())).unwrap();
    }

    let manager = SkillManager::new(temp.path().join("skills"));
    let entries = manager
        .install(&origin_dir.to_string_lossy(), Some("radar"), None, true)
        .unwrap();

    assert_eq!(entries[0].branch.as_deref(), Some("radar"));
    let info = manager.info("weather").unwrap();
    assert_eq!(info.description, "Radar branch build");
}
