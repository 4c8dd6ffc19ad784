//! Integration tests for archive

#[cfg(test)]
mod tests {
    use ifw_archive::*;
    use ifw_errors::{ArchiveError, Error};
    use std::path::Path;
    use tempfile::TempDir;

    fn sample_tree(root: &Path) {
        std::fs::create_dir_all(root.join("bin")).unwrap();
        std::fs::create_dir_all(root.join("share/doc")).unwrap();
        std::fs::write(root.join("bin/tool"), "#!/bin/sh\necho tool\n").unwrap();
        std::fs::write(root.join("share/doc/README"), "readme").unwrap();
        #[cfg(unix)]
        std::os::unix::fs::symlink("bin/tool", root.join("tool")).unwrap();
    }

    /// Write a tar with one file whose raw name bypasses `Header::set_path`
    fn raw_tar(path: &Path, name: &[u8]) {
        let mut header = tar::Header::new_gnu();
        header.as_gnu_mut().unwrap().name[..name.len()].copy_from_slice(name);
        header.set_size(4);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        let mut builder = tar::Builder::new(std::fs::File::create(path).unwrap());
        builder.append(&header, &b"evil"[..]).unwrap();
        builder.finish().unwrap();
    }

    #[tokio::test]
    async fn test_create_list_extract_zstd() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        sample_tree(&src);

        let archive = tmp.path().join("payload.7z");
        create_archive(&src, &archive, Compression::Zstd).await.unwrap();
        assert_eq!(detect_format_sync(&archive).unwrap(), ArchiveFormat::TarZstd);

        let entries = list_entries(&archive).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.path.clone()).collect();
        assert!(names.contains(&Path::new("bin/tool").to_path_buf()));
        assert!(names.contains(&Path::new("share/doc/README").to_path_buf()));

        let dest = tmp.path().join("target");
        let report = extract(&archive, &dest).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(dest.join("share/doc/README")).unwrap(),
            "readme"
        );
        assert!(report.dirs.contains(&dest));
        assert!(report.dirs.contains(&dest.join("share/doc")));
        assert!(report.files.contains(&dest.join("bin/tool")));
        #[cfg(unix)]
        assert_eq!(
            std::fs::read_link(dest.join("tool")).unwrap(),
            Path::new("bin/tool")
        );
    }

    #[tokio::test]
    async fn test_plain_tar_into_existing_dir() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        sample_tree(&src);
        let archive = tmp.path().join("payload.tar");
        create_archive(&src, &archive, Compression::None).await.unwrap();
        assert_eq!(detect_format_sync(&archive).unwrap(), ArchiveFormat::Tar);

        let dest = tmp.path().join("target");
        std::fs::create_dir_all(dest.join("bin")).unwrap();
        let report = extract(&archive, &dest).await.unwrap();
        assert!(!report.dirs.contains(&dest));
        assert!(!report.dirs.contains(&dest.join("bin")));
        assert!(report.dirs.contains(&dest.join("share")));
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("evil.tar");
        raw_tar(&archive, b"../evil.txt");

        let dest = tmp.path().join("target");
        let err = extract(&archive, &dest).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Archive(ArchiveError::PathTraversal { .. })
        ));
        assert!(!tmp.path().join("evil.txt").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_occupant_rejected() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        sample_tree(&src);
        let archive = tmp.path().join("payload.tar");
        create_archive(&src, &archive, Compression::None).await.unwrap();

        let dest = tmp.path().join("target");
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("tool"), "user file").unwrap();

        let err = extract(&archive, &dest).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Archive(ArchiveError::SymlinkAlreadyExists { .. })
        ));
        assert_eq!(std::fs::read_to_string(dest.join("tool")).unwrap(), "user file");
    }

    #[tokio::test]
    async fn test_garbage_is_corrupt_and_missing_is_open_error() {
        let tmp = TempDir::new().unwrap();
        let garbage = tmp.path().join("garbage.bin");
        std::fs::write(&garbage, vec![7u8; 1024]).unwrap();
        assert!(matches!(
            list_entries(&garbage).await.unwrap_err(),
            Error::Archive(ArchiveError::Corrupt { .. })
        ));
        assert!(matches!(
            list_entries(&tmp.path().join("missing.tar")).await.unwrap_err(),
            Error::Archive(ArchiveError::CouldNotOpen { .. })
        ));
    }

    #[tokio::test]
    async fn test_checksum_matches_hash_crate() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        sample_tree(&src);
        let archive = tmp.path().join("payload.tar");
        create_archive(&src, &archive, Compression::None).await.unwrap();
        let a = checksum(&archive, ifw_hash::HashAlgorithm::Sha256).await.unwrap();
        let b = ifw_hash::Hash::hash_file(ifw_hash::HashAlgorithm::Sha256, &archive)
            .await
            .unwrap();
        assert_eq!(a, b);
    }
}
