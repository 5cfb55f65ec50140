use anyhow::{Context, Result};
use std::{
    fs,
    io,
    path::{Path, PathBuf},
};
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

/// Archives `parent/folder` into `<dest_dir>/<zip_name>.zip` and returns
/// the path of the written archive.
///
/// Entry names are rooted at `folder/`, so unpacking recreates the folder
/// itself instead of spilling its contents.
pub fn zip_dir(parent: &Path, folder: &str, zip_name: &str, dest_dir: &Path) -> Result<PathBuf> {
    let source_root = parent.join(folder);

    fs::create_dir_all(dest_dir).with_context(|| {
        format!("failed creating archive directory {}", dest_dir.display())
    })?;
    let zip_path = dest_dir.join(format!("{}.zip", zip_name));

    let file = fs::File::create(&zip_path)
        .with_context(|| format!("failed creating archive {}", zip_path.display()))?;
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    add_dir(&mut writer, &source_root, folder, options)?;

    writer
        .finish()
        .with_context(|| format!("failed finalizing archive {}", zip_path.display()))?;

    Ok(zip_path)
}

fn add_dir(
    writer: &mut ZipWriter<fs::File>,
    dir: &Path,
    prefix: &str,
    options: FileOptions,
) -> Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("failed reading directory {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<_>>()
        .with_context(|| format!("failed reading directory {}", dir.display()))?;
    entries.sort();

    for path in entries {
        let file_name = match path.file_name().and_then(|name| name.to_str()) {
            Some(name) => name,
            None => continue,
        };
        let name = format!("{}/{}", prefix, file_name);

        if path.is_dir() {
            writer
                .add_directory(name.as_str(), options)
                .with_context(|| format!("failed archiving directory {}", path.display()))?;
            add_dir(writer, &path, &name, options)?;
        } else {
            writer
                .start_file(name.as_str(), options)
                .with_context(|| format!("failed archiving file {}", path.display()))?;
            let mut source = fs::File::open(&path)
                .with_context(|| format!("failed opening {}", path.display()))?;
            io::copy(&mut source, writer)
                .with_context(|| format!("failed archiving file {}", path.display()))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn archives_a_tree_rooted_at_its_folder() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("full_resolution");
        fs::create_dir_all(root.join("Brazil")).unwrap();
        fs::write(root.join("1003.jpg"), b"jpeg bytes").unwrap();
        fs::write(root.join("Brazil").join("1004.jpg"), b"jpeg bytes").unwrap();

        let zip_path = zip_dir(
            dir.path(),
            "full_resolution",
            "all_imgs_full_resolution",
            &dir.path().join("zip_files"),
        )
        .unwrap();

        assert_eq!(
            zip_path,
            dir.path().join("zip_files/all_imgs_full_resolution.zip")
        );

        let mut archive = zip::ZipArchive::new(fs::File::open(&zip_path).unwrap()).unwrap();
        let names: BTreeSet<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_owned())
            .collect();

        assert!(names.contains("full_resolution/1003.jpg"));
        assert!(names.contains("full_resolution/Brazil/1004.jpg"));
    }
}
