//! Collecting audio files from command-line arguments

use cadence_service::is_audio_file;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Expand files and directories into a list of audio files
///
/// Files are kept in argument order; each directory contributes its audio
/// files recursively, sorted by path. Non-audio files are skipped.
pub fn collect_audio_files(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
                .map(|e| e.into_path())
                .filter(|p| p.is_file() && is_audio_file(p))
                .collect();
            found.sort();
            files.extend(found);
        } else if is_audio_file(input) {
            files.push(input.clone());
        } else {
            tracing::warn!(path = %input.display(), "Not an audio file, skipping");
        }
    }

    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn directories_are_walked_in_sorted_order() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("disc2")).unwrap();
        fs::write(dir.path().join("disc2").join("01.flac"), b"").unwrap();
        fs::write(dir.path().join("b.mp3"), b"").unwrap();
        fs::write(dir.path().join("a.ogg"), b"").unwrap();
        fs::write(dir.path().join("cover.jpg"), b"").unwrap();

        let files = collect_audio_files(&[dir.path().to_path_buf()]);
        let names: Vec<String> = files
            .iter()
            .map(|p| {
                p.strip_prefix(dir.path())
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();

        assert_eq!(names, vec!["a.ogg", "b.mp3", "disc2/01.flac"]);
    }

    #[test]
    fn explicit_files_keep_argument_order() {
        let inputs = vec![
            PathBuf::from("/music/z.flac"),
            PathBuf::from("/music/notes.txt"),
            PathBuf::from("/music/a.flac"),
        ];

        let files = collect_audio_files(&inputs);
        assert_eq!(
            files,
            vec![PathBuf::from("/music/z.flac"), PathBuf::from("/music/a.flac")]
        );
    }
}
