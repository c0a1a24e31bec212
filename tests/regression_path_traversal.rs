//! A recovery log is plain JSON that anyone can edit. Restoring must never
//! write outside the recorded folder, whatever the file names say.

#![allow(missing_docs)]

#[cfg(test)]
mod tests {
    use std::fs;

    use dirsweep::recovery::log::{DeletionRecord, FileSnapshot, write_log};
    use dirsweep::recovery::restorer::restore_from_log;

    fn snapshot(name: &str) -> FileSnapshot {
        FileSnapshot {
            name: name.to_string(),
            data: "payload".to_string(),
        }
    }

    #[test]
    fn restore_refuses_file_names_that_escape_the_folder() {
        let work = tempfile::tempdir().unwrap();
        let folder = work.path().join("jail/inner");
        let outside = work.path().join("jail/escaped.txt");
        let absolute = work.path().join("absolute.txt");
        let log = work.path().join("delete_log.json");

        write_log(
            &log,
            &[DeletionRecord {
                path: folder.to_string_lossy().into_owned(),
                files: vec![
                    snapshot("../escaped.txt"),
                    snapshot(&absolute.to_string_lossy()),
                    snapshot("sub/nested.txt"),
                    snapshot(".."),
                    snapshot(""),
                    snapshot("legit.txt"),
                ],
                timestamp: 0.0,
            }],
        )
        .unwrap();

        let report = restore_from_log(&log).unwrap();

        assert_eq!(report.files_written, 1);
        assert_eq!(report.failures.len(), 5);
        assert!(
            report
                .failures
                .iter()
                .all(|f| f.error.code() == "DSW-2006")
        );
        assert!(!outside.exists());
        assert!(!absolute.exists());
        assert!(!folder.join("sub").exists());
        assert_eq!(
            fs::read_to_string(folder.join("legit.txt")).unwrap(),
            "payload"
        );
    }

    #[test]
    fn restore_refuses_relative_folder_paths() {
        let work = tempfile::tempdir().unwrap();
        let log = work.path().join("delete_log.json");
        fs::write(
            &log,
            r#"[{"path": "../../somewhere", "files": [], "timestamp": 0.0}]"#,
        )
        .unwrap();

        let report = restore_from_log(&log).unwrap();

        assert_eq!(report.folders_restored, 0);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].error.code(), "DSW-2006");
    }
}
