use proji::db::Database;
use proji::models::*;
use proji::storage::StorageService;
use proji::Error;
use speculate2::speculate;

fn create_test_class(name: &str, label: &str) -> Class {
    let mut class = Class::new(name, label, false);
    class.add_folder(Folder::new("src/"));
    class.add_folder(Folder::new("docs/"));
    class.add_file(File::new("src/main.py"));
    class.add_file(File::with_template("README.md", "templates/README.md"));
    class
        .add_script(Script {
            name: "init_virtualenv.sh".to_string(),
            kind: ScriptKind::Post,
            exec_number: 1,
            run_as_sudo: false,
            args: vec![],
        })
        .expect("Failed to add script");
    class
        .add_script(Script {
            name: "init_git.sh".to_string(),
            kind: ScriptKind::Post,
            exec_number: 2,
            run_as_sudo: true,
            args: vec!["--initial-branch".to_string(), "main".to_string()],
        })
        .expect("Failed to add script");
    class
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "classes" {
        describe "save_class" {
            it "stores a class with all nested entities" {
                let class = create_test_class("my-example", "mex");
                db.save_class(&class).expect("Failed to save class");

                let loaded = db.load_class("mex").expect("Failed to load class");
                assert_eq!(loaded, class);
            }

            it "rejects a label that is already taken" {
                let first = create_test_class("first", "dup");
                db.save_class(&first).expect("Failed to save class");

                let second = Class::new("second", "dup", false);
                let result = db.save_class(&second);

                assert!(matches!(result, Err(Error::Conflict(_))));
                assert_eq!(db.load_class("dup").expect("Query failed"), first);
            }

            it "rejects a name that is already taken" {
                db.save_class(&Class::new("shared", "one", false)).expect("Failed to save class");
                let result = db.save_class(&Class::new("shared", "two", false));
                assert!(matches!(result, Err(Error::Conflict(_))));
            }

            it "allows only one default class" {
                db.save_class(&Class::new("base", "bs", true)).expect("Failed to save class");
                let result = db.save_class(&Class::new("other", "ot", true));

                assert!(matches!(result, Err(Error::Conflict(_))));
                assert!(matches!(db.load_class("ot"), Err(Error::NotFound { .. })));
            }

            it "rejects duplicate exec numbers within a script type" {
                let mut class = Class::new("scripts", "sc", false);
                class.scripts.push(Script::new("a.sh", ScriptKind::Pre, 1));
                class.scripts.push(Script::new("b.sh", ScriptKind::Pre, 1));

                let result = db.save_class(&class);
                assert!(matches!(result, Err(Error::Validation(_))));
                assert!(matches!(db.load_class("sc"), Err(Error::NotFound { .. })));
            }

            it "accepts equal exec numbers across script types" {
                let mut class = Class::new("scripts", "sc", false);
                class.scripts.push(Script::new("a.sh", ScriptKind::Pre, 1));
                class.scripts.push(Script::new("b.sh", ScriptKind::Post, 1));

                db.save_class(&class).expect("Failed to save class");
                assert_eq!(db.load_class("sc").expect("Query failed").scripts.len(), 2);
            }

            it "rejects a class without a label" {
                let result = db.save_class(&Class::new("nameless", "", false));
                assert!(matches!(result, Err(Error::Validation(_))));
            }

            it "rejects destinations outside the project root" {
                let mut escaping = create_test_class("escaping", "esc");
                escaping.files.push(File::new("../../etc/evil"));
                assert!(matches!(db.save_class(&escaping), Err(Error::Validation(_))));

                let mut absolute = create_test_class("absolute", "abs");
                absolute.folders.push(Folder::new("/abs"));
                assert!(matches!(db.replace_class(&absolute), Err(Error::Validation(_))));

                assert!(db.load_all_classes().expect("Query failed").is_empty());
            }

            it "leaves no trace when a nested write fails" {
                let mut class = create_test_class("broken", "brk");
                // Bypass the model's deduplication to force a store failure
                // on the third file.
                class.files.push(File::new("src/main.py"));

                let result = db.save_class(&class);
                assert!(result.is_err());

                assert!(matches!(db.load_class("brk"), Err(Error::NotFound { .. })));
                assert!(db.load_all_classes().expect("Query failed").is_empty());
                db.save_class(&create_test_class("broken", "brk")).expect("Label should still be free");
            }
        }

        describe "replace_class" {
            it "overwrites the class with the same label" {
                db.save_class(&create_test_class("my-example", "mex")).expect("Failed to save class");

                let mut updated = Class::new("my-example-v2", "mex", false);
                updated.add_file(File::new("main.rs"));
                db.replace_class(&updated).expect("Failed to replace class");

                assert_eq!(db.load_class("mex").expect("Query failed"), updated);
                assert!(matches!(db.load_class("my-example"), Err(Error::NotFound { .. })));
                assert_eq!(db.load_all_classes().expect("Query failed").len(), 1);
            }

            it "stores a new class when the label is free" {
                let class = create_test_class("fresh", "fr");
                db.replace_class(&class).expect("Failed to replace class");
                assert_eq!(db.load_class("fr").expect("Query failed"), class);
            }

            it "still rejects a name owned by another class" {
                db.save_class(&Class::new("taken", "tk", false)).expect("Failed to save class");
                db.save_class(&Class::new("mine", "mn", false)).expect("Failed to save class");

                let result = db.replace_class(&Class::new("taken", "mn", false));
                assert!(matches!(result, Err(Error::Conflict(_))));
                assert_eq!(db.load_class("mn").expect("Query failed").name, "mine");
            }
        }

        describe "load_class" {
            it "finds a class by name" {
                let class = create_test_class("my-example", "mex");
                db.save_class(&class).expect("Failed to save class");

                assert_eq!(db.load_class("my-example").expect("Query failed"), class);
            }

            it "prefers a label match over a name match" {
                db.save_class(&Class::new("abc", "x", false)).expect("Failed to save class");
                db.save_class(&Class::new("y", "abc", false)).expect("Failed to save class");

                assert_eq!(db.load_class("abc").expect("Query failed").name, "y");
            }

            it "returns not found for an unknown class" {
                let result = db.load_class("missing");
                assert!(matches!(result, Err(Error::NotFound { entity: "class", .. })));
            }

            it "returns scripts that sort into exec order" {
                let mut class = Class::new("ordered", "ord", false);
                class.add_script(Script::new("third.sh", ScriptKind::Post, 9)).expect("Failed");
                class.add_script(Script::new("first.sh", ScriptKind::Post, 1)).expect("Failed");
                class.add_script(Script::new("second.sh", ScriptKind::Post, 4)).expect("Failed");
                db.save_class(&class).expect("Failed to save class");

                let loaded = db.load_class("ord").expect("Query failed");
                assert_eq!(loaded.scripts, class.scripts);

                let names: Vec<_> = loaded
                    .scripts_in_exec_order(ScriptKind::Post)
                    .iter()
                    .map(|s| s.name.clone())
                    .collect();
                assert_eq!(names, vec!["first.sh", "second.sh", "third.sh"]);
            }

            it "keeps empty collections empty" {
                db.save_class(&Class::new("empty", "em", false)).expect("Failed to save class");

                let loaded = db.load_class("em").expect("Query failed");
                assert!(loaded.is_empty());
            }
        }

        describe "load_all_classes" {
            it "returns all classes ordered by name, fully populated" {
                db.save_class(&create_test_class("zebra", "zb")).expect("Failed");
                db.save_class(&create_test_class("alpha", "al")).expect("Failed");

                let classes = db.load_all_classes().expect("Query failed");
                assert_eq!(classes.len(), 2);
                assert_eq!(classes[0].name, "alpha");
                assert_eq!(classes[1].name, "zebra");
                assert_eq!(classes[1].files.len(), 2);
                assert_eq!(classes[1].scripts.len(), 2);
            }
        }

        describe "delete_class" {
            it "removes the class" {
                db.save_class(&create_test_class("my-example", "mex")).expect("Failed to save class");
                db.delete_class("mex").expect("Failed to delete class");

                assert!(matches!(db.load_class("mex"), Err(Error::NotFound { .. })));
            }

            it "frees the label for reuse" {
                db.save_class(&create_test_class("my-example", "mex")).expect("Failed to save class");
                db.delete_class("my-example").expect("Failed to delete class");

                let class = Class::new("other", "mex", false);
                db.save_class(&class).expect("Failed to save class");
                assert_eq!(db.load_class("mex").expect("Query failed"), class);
            }

            it "returns not found for an unknown class" {
                let result = db.delete_class("missing");
                assert!(matches!(result, Err(Error::NotFound { .. })));
            }
        }
    }

    describe "statuses" {
        describe "load_all_statuses" {
            it "returns the default statuses ordered by id" {
                let statuses = db.load_all_statuses().expect("Query failed");
                let titles: Vec<_> = statuses.iter().map(|s| s.title.as_str()).collect();

                assert_eq!(titles, vec!["active", "inactive", "done", "dead", "unknown"]);
                assert!(statuses.windows(2).all(|w| w[0].id < w[1].id));
            }
        }

        describe "save_status" {
            it "creates a status with a new id" {
                let status = db.save_status(CreateStatusInput {
                    title: "archived".to_string(),
                    comment: "Kept for reference.".to_string(),
                }).expect("Failed to save status");

                assert_eq!(db.load_status(status.id).expect("Query failed"), status);
                assert_eq!(db.load_status_by_title("archived").expect("Query failed"), status);
            }

            it "rejects a duplicate title" {
                let result = db.save_status(CreateStatusInput {
                    title: "active".to_string(),
                    comment: String::new(),
                });
                assert!(matches!(result, Err(Error::Conflict(_))));
            }

            it "rejects an empty title" {
                let result = db.save_status(CreateStatusInput {
                    title: "  ".to_string(),
                    comment: String::new(),
                });
                assert!(matches!(result, Err(Error::Validation(_))));
            }
        }

        describe "update_status" {
            it "updates only the given fields" {
                let active = db.load_status_by_title("active").expect("Query failed");
                let updated = db.update_status(active.id, UpdateStatusInput {
                    title: None,
                    comment: Some("Busy with it.".to_string()),
                }).expect("Failed to update status");

                assert_eq!(updated.title, "active");
                assert_eq!(updated.comment, "Busy with it.");
                assert_eq!(db.load_status(active.id).expect("Query failed"), updated);
            }

            it "rejects a title owned by another status" {
                let done = db.load_status_by_title("done").expect("Query failed");
                let result = db.update_status(done.id, UpdateStatusInput {
                    title: Some("dead".to_string()),
                    comment: None,
                });
                assert!(matches!(result, Err(Error::Conflict(_))));
            }

            it "returns not found for an unknown status" {
                let result = db.update_status(9999, UpdateStatusInput::default());
                assert!(matches!(result, Err(Error::NotFound { entity: "status", .. })));
            }
        }

        describe "delete_status" {
            it "removes the status" {
                let dead = db.load_status_by_title("dead").expect("Query failed");
                db.delete_status(dead.id).expect("Failed to delete status");

                assert!(matches!(db.load_status(dead.id), Err(Error::NotFound { .. })));
                assert_eq!(db.load_all_statuses().expect("Query failed").len(), 4);
            }

            it "returns not found for an unknown status" {
                assert!(matches!(db.delete_status(9999), Err(Error::NotFound { .. })));
            }
        }
    }
}
