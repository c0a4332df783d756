//! Integration tests for event dispatch against MockForge.

use std::sync::Arc;

use postbridge::core::frontmatter::PostContent;
use postbridge::core::types::ExternalId;
use postbridge::engine::{ChangeEvent, DispatchError, Dispatcher, Outcome};
use postbridge::forge::mock::{content_sha, FailOn, MockForge, MockOperation};
use postbridge::forge::{ForgeError, UpdateFileRequest};

fn dispatcher(forge: &MockForge) -> Dispatcher {
    Dispatcher::new(Arc::new(forge.clone()), "md")
}

fn id(s: &str) -> ExternalId {
    ExternalId::new(s).unwrap()
}

fn post(title: &str, date: &str) -> PostContent {
    PostContent {
        title: title.to_string(),
        body: "text".to_string(),
        description: None,
        tags: Vec::new(),
        date: date.to_string(),
    }
}

mod create {
    use super::*;

    #[tokio::test]
    async fn hello_world_example() {
        let forge = MockForge::new();

        let outcome = dispatcher(&forge)
            .dispatch(ChangeEvent::Create {
                id: id("abc123"),
                post: post("Hello World", "2021-01-01"),
            })
            .await
            .unwrap();

        assert_eq!(outcome.to_string(), "Post Created: hello-world-abc123.md");
        assert_eq!(forge.file_names("master"), vec!["hello-world-abc123.md"]);
        assert_eq!(
            forge.file("master", "hello-world-abc123.md").unwrap(),
            "---\ntitle: Hello World\ndate: 2021-01-01\n---\n\ntext"
        );
        assert_eq!(forge.commit_count("master"), 1);
    }

    #[tokio::test]
    async fn front_matter_reflects_fields() {
        let forge = MockForge::new();
        let content = PostContent {
            title: "Tagged".into(),
            body: "body".into(),
            description: Some("A subtitle".into()),
            tags: vec!["rust".into(), "web".into()],
            date: "2021-03-04".into(),
        };

        dispatcher(&forge)
            .dispatch(ChangeEvent::Create {
                id: id("t1"),
                post: content,
            })
            .await
            .unwrap();

        assert_eq!(
            forge.file("master", "tagged-t1.md").unwrap(),
            "---\ntitle: Tagged\ndate: 2021-03-04\ndescription: A subtitle\ntags:\n- rust\n- web\n---\n\nbody"
        );
    }

    #[tokio::test]
    async fn numeric_looking_fields_stay_strings() {
        let forge = MockForge::new();
        let content = PostContent {
            title: "1984".into(),
            body: "body".into(),
            description: Some("3.14".into()),
            tags: vec!["2021".into(), "on".into()],
            date: "2021-03-04".into(),
        };

        dispatcher(&forge)
            .dispatch(ChangeEvent::Create {
                id: id("n1"),
                post: content,
            })
            .await
            .unwrap();

        let text = forge.file("master", "1984-n1.md").unwrap();
        let yaml = text
            .strip_prefix("---\n")
            .and_then(|rest| rest.split_once("---\n"))
            .map(|(yaml, _)| yaml)
            .unwrap();
        let front: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(front["title"].as_str(), Some("1984"));
        assert_eq!(front["description"].as_str(), Some("3.14"));
        assert_eq!(front["tags"][0].as_str(), Some("2021"));
        assert_eq!(front["tags"][1].as_str(), Some("on"));
    }

    #[tokio::test]
    async fn commit_message_names_file() {
        let forge = MockForge::new();
        dispatcher(&forge)
            .dispatch(ChangeEvent::Create {
                id: id("abc"),
                post: post("A", "d"),
            })
            .await
            .unwrap();

        assert!(forge.operations().contains(&MockOperation::CreateFile {
            name: "a-abc.md".into(),
            branch: "master".into(),
            message: "create: a-abc.md".into(),
        }));
    }
}

mod update {
    use super::*;

    #[tokio::test]
    async fn same_name_replaces_in_place() {
        let forge = MockForge::new().with_post("hello-world-abc123.md", "old");

        let outcome = dispatcher(&forge)
            .dispatch(ChangeEvent::Update {
                id: id("abc123"),
                post: post("Hello World", "2021-02-02"),
            })
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::Updated {
                name: "hello-world-abc123.md".into()
            }
        );
        assert_eq!(forge.file_names("master"), vec!["hello-world-abc123.md"]);
        assert!(forge
            .file("master", "hello-world-abc123.md")
            .unwrap()
            .contains("date: 2021-02-02"));
        assert!(forge.staging_branches().is_empty());
    }

    #[tokio::test]
    async fn sends_freshly_fetched_sha() {
        let forge = MockForge::new().with_post("hello-world-abc123.md", "old");

        dispatcher(&forge)
            .dispatch(ChangeEvent::Update {
                id: id("abc123"),
                post: post("Hello World", "d"),
            })
            .await
            .unwrap();

        assert!(forge.operations().contains(&MockOperation::UpdateFile {
            name: "hello-world-abc123.md".into(),
            branch: "master".into(),
            sha: content_sha("old"),
        }));
    }

    #[tokio::test]
    async fn version_mismatch_leaves_file() {
        use postbridge::forge::Forge;

        let forge = MockForge::new().with_post("hello-world-abc123.md", "old");
        let err = forge
            .update_file(UpdateFileRequest {
                name: "hello-world-abc123.md".into(),
                content: "new".into(),
                sha: content_sha("not what is stored"),
                message: "update: hello-world-abc123.md".into(),
                branch: None,
            })
            .await
            .unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(
            forge.file("master", "hello-world-abc123.md").as_deref(),
            Some("old")
        );
    }

    #[tokio::test]
    async fn title_change_renames() {
        let forge = MockForge::new().with_post("hello-world-abc123.md", "old");

        let outcome = dispatcher(&forge)
            .dispatch(ChangeEvent::Update {
                id: id("abc123"),
                post: post("Goodbye World", "2021-02-02"),
            })
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::Renamed {
                from: "hello-world-abc123.md".into(),
                to: "goodbye-world-abc123.md".into(),
            }
        );
        assert_eq!(forge.file_names("master"), vec!["goodbye-world-abc123.md"]);
        assert_eq!(forge.commit_count("master"), 1);
    }

    #[tokio::test]
    async fn missing_post_is_created() {
        let forge = MockForge::new();

        let outcome = dispatcher(&forge)
            .dispatch(ChangeEvent::Update {
                id: id("abc123"),
                post: post("Hello World", "2021-02-02"),
            })
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::Created {
                name: "hello-world-abc123.md".into()
            }
        );
        assert!(forge
            .file("master", "hello-world-abc123.md")
            .unwrap()
            .contains("date: 2021-02-02"));
    }

    #[tokio::test]
    async fn failed_rename_is_a_rename_error() {
        let forge = MockForge::new()
            .with_post("hello-world-abc123.md", "old")
            .fail_on(FailOn::MergePr(ForgeError::StaleVersion("moved".into())));

        let err = dispatcher(&forge)
            .dispatch(ChangeEvent::Update {
                id: id("abc123"),
                post: post("Goodbye World", "d"),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Rename(_)));
        assert!(err.is_conflict());
        assert_eq!(forge.file_names("master"), vec!["hello-world-abc123.md"]);
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn removes_existing_post() {
        let forge = MockForge::new()
            .with_post("hello-world-abc123.md", "old")
            .with_post("keep-xyz.md", "keep");

        let outcome = dispatcher(&forge)
            .dispatch(ChangeEvent::Delete { id: id("abc123") })
            .await
            .unwrap();

        assert_eq!(outcome.to_string(), "Post Deleted: hello-world-abc123.md");
        assert_eq!(forge.file_names("master"), vec!["keep-xyz.md"]);
        assert!(forge.operations().contains(&MockOperation::DeleteFile {
            name: "hello-world-abc123.md".into(),
            branch: "master".into(),
            sha: content_sha("old"),
        }));
    }

    #[tokio::test]
    async fn missing_post_is_a_no_op() {
        let forge = MockForge::new().with_post("keep-xyz.md", "keep");

        let outcome = dispatcher(&forge)
            .dispatch(ChangeEvent::Delete { id: id("abc123") })
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::AlreadyAbsent { id: id("abc123") });
        assert_eq!(forge.commit_count("master"), 0);
        // Terminal: only the lookup happened
        assert!(forge.operations().iter().all(|op| !op.is_mutation()));
    }

    #[tokio::test]
    async fn redelivery_converges() {
        let forge = MockForge::new().with_post("hello-world-abc123.md", "old");
        let dispatcher = dispatcher(&forge);

        dispatcher
            .dispatch(ChangeEvent::Delete { id: id("abc123") })
            .await
            .unwrap();
        let second = dispatcher
            .dispatch(ChangeEvent::Delete { id: id("abc123") })
            .await
            .unwrap();

        assert!(matches!(second, Outcome::AlreadyAbsent { .. }));
        assert!(forge.file_names("master").is_empty());
        assert_eq!(forge.commit_count("master"), 1);
    }

    #[tokio::test]
    async fn lookup_failure_is_reported() {
        let forge = MockForge::new().fail_on(FailOn::FindPost(ForgeError::NetworkError(
            "timed out".into(),
        )));

        let err = dispatcher(&forge)
            .dispatch(ChangeEvent::Delete { id: id("abc123") })
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Store(ForgeError::NetworkError(_))));
        assert!(!err.is_conflict());
    }
}
