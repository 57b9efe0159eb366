//! Version-control backend for skill sources.
//!
//! The Manager never talks to git directly; it goes through the narrow
//! [`VersionControl`] trait so the concrete tool can be swapped or mocked in
//! tests without touching lifecycle logic. The default backend uses git2.

use crate::error::{Result, SkillError};
use std::path::Path;

/// The three version-control operations the skill lifecycle needs.
pub trait VersionControl: Send + Sync {
    /// Clone `url` into `dest`, optionally checking out a branch or tag.
    fn clone_repo(&self, url: &str, dest: &Path, branch: Option<&str>, tag: Option<&str>) -> Result<()>;

    /// The currently checked-out revision of a local repository, preferring
    /// the branch head and falling back to the detached HEAD commit.
    fn current_revision(&self, repo: &Path) -> Result<String>;

    /// Fetch the latest state from origin and hard-reset the working tree to
    /// it. Returns the new revision.
    fn fetch_and_reset(&self, repo: &Path) -> Result<String>;
}

/// git2-backed implementation of [`VersionControl`].
#[derive(Debug, Default, Clone)]
pub struct GitBackend;

impl GitBackend {
    pub fn new() -> Self {
        Self
    }

    fn open(repo: &Path) -> Result<git2::Repository> {
        git2::Repository::open(repo)
            .map_err(|e| SkillError::Security(format!("{} is not a git repository: {}", repo.display(), e)))
    }
}

impl VersionControl for GitBackend {
    fn clone_repo(&self, url: &str, dest: &Path, branch: Option<&str>, tag: Option<&str>) -> Result<()> {
        let mut builder = git2::build::RepoBuilder::new();

        if let Some(branch) = branch {
            builder.branch(branch);
        }

        let repo = builder
            .clone(url, dest)
            .map_err(|e| SkillError::Security(format!("failed to clone {}: {}", url, e)))?;

        if let Some(tag) = tag {
            let spec = format!("refs/tags/{}", tag);
            let object = repo
                .revparse_single(&spec)
                .and_then(|obj| obj.peel(git2::ObjectType::Commit))
                .map_err(|e| SkillError::Security(format!("tag '{}' not found in {}: {}", tag, url, e)))?;
            repo.checkout_tree(&object, None)
                .map_err(|e| SkillError::Security(format!("failed to check out tag '{}': {}", tag, e)))?;
            repo.set_head_detached(object.id())
                .map_err(|e| SkillError::Security(format!("failed to detach at tag '{}': {}", tag, e)))?;
        }

        Ok(())
    }

    fn current_revision(&self, repo: &Path) -> Result<String> {
        let repo_path = repo;
        let repo = Self::open(repo)?;

        let head = repo
            .head()
            .map_err(|e| SkillError::Security(format!("cannot resolve HEAD in {}: {}", repo_path.display(), e)))?;

        // Branch heads and detached HEADs both resolve to a commit id.
        head.target()
            .map(|oid| oid.to_string())
            .ok_or_else(|| SkillError::Security(format!("HEAD has no target in {}", repo_path.display())))
    }

    fn fetch_and_reset(&self, repo: &Path) -> Result<String> {
        let repo = Self::open(repo)?;

        let mut remote = repo
            .find_remote("origin")
            .map_err(|e| SkillError::Security(format!("no origin remote: {}", e)))?;

        remote
            .fetch(&[] as &[&str], None, None)
            .map_err(|e| SkillError::Security(format!("fetch failed: {}", e)))?;

        let fetch_head = repo
            .find_reference("FETCH_HEAD")
            .map_err(|e| SkillError::Security(format!("no FETCH_HEAD after fetch: {}", e)))?;
        let fetched = repo
            .reference_to_annotated_commit(&fetch_head)
            .map_err(|e| SkillError::Security(format!("cannot resolve fetched commit: {}", e)))?;

        let object = repo
            .find_object(fetched.id(), None)
            .map_err(|e| SkillError::Security(format!("fetched commit missing: {}", e)))?;
        repo.reset(&object, git2::ResetType::Hard, None)
            .map_err(|e| SkillError::Security(format!("hard reset failed: {}", e)))?;

        Ok(fetched.id().to_string())
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{commit_all, init_repo_with_commit};
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_current_revision_of_branch_head() {
        let temp = TempDir::new().unwrap();
        let expected = init_repo_with_commit(temp.path(), "file.txt", "hello");

        let backend = GitBackend::new();
        assert_eq!(backend.current_revision(temp.path()).unwrap(), expected);
    }

    #[test]
    fn test_current_revision_not_a_repo() {
        let temp = TempDir::new().unwrap();
        let backend = GitBackend::new();
        assert!(matches!(
            backend.current_revision(temp.path()),
            Err(SkillError::Security(_))
        ));
    }

    #[test]
    fn test_clone_local_repo() {
        let temp = TempDir::new().unwrap();
        let origin = temp.path().join("origin");
        std::fs::create_dir(&origin).unwrap();
        let revision = init_repo_with_commit(&origin, "file.txt", "hello");

        let dest = temp.path().join("clone");
        let backend = GitBackend::new();
        backend
            .clone_repo(origin.to_str().unwrap(), &dest, None, None)
            .unwrap();

        assert_eq!(backend.current_revision(&dest).unwrap(), revision);
        assert_eq!(std::fs::read_to_string(dest.join("file.txt")).unwrap(), "hello");
    }

    #[test]
    fn test_fetch_and_reset_picks_up_new_commit() {
        let temp = TempDir::new().unwrap();
        let origin = temp.path().join("origin");
        std::fs::create_dir(&origin).unwrap();
        init_repo_with_commit(&origin, "file.txt", "v1");

        let dest = temp.path().join("clone");
        let backend = GitBackend::new();
        backend
            .clone_repo(origin.to_str().unwrap(), &dest, None, None)
            .unwrap();

        let origin_repo = git2::Repository::open(&origin).unwrap();
        std::fs::write(origin.join("file.txt"), "v2").unwrap();
        let new_commit = commit_all(&origin_repo, "Second").to_string();

        let revision = backend.fetch_and_reset(&dest).unwrap();
        assert_eq!(revision, new_commit);
        assert_eq!(std::fs::read_to_string(dest.join("file.txt")).unwrap(), "v2");
    }

    #[test]
    fn test_clone_detached_at_tag() {
        let temp = TempDir::new().unwrap();
        let origin = temp.path().join("origin");
        std::fs::create_dir(&origin).unwrap();
        let first = init_repo_with_commit(&origin, "file.txt", "v1");

        let origin_repo = git2::Repository::open(&origin).unwrap();
        {
            let object = origin_repo
                .find_object(git2::Oid::from_str(&first).unwrap(), None)
                .unwrap();
            let sig = git2::Signature::now("tester", "tester@example.com").unwrap();
            origin_repo.tag("v1.0", &object, &sig, "release", false).unwrap();
        }
        std::fs::write(origin.join("file.txt"), "v2").unwrap();
        commit_all(&origin_repo, "Second");

        let dest = temp.path().join("clone");
        let backend = GitBackend::new();
        backend
            .clone_repo(origin.to_str().unwrap(), &dest, None, Some("v1.0"))
            .unwrap();

        assert_eq!(backend.current_revision(&dest).unwrap(), first);
        assert_eq!(std::fs::read_to_string(dest.join("file.txt")).unwrap(), "v1");
    }
}
