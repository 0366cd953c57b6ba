//! End-to-end scenarios through the provider surface: registry lifecycle,
//! byte channels, directory streams, copies and attribute views.

#[cfg(test)]
mod tests {
    use crate::harness::{TestShare, AUTHORITY};
    use smbfs_provider::{AccessMode, CopyOption, OpenOption, SmbError, SmbPath};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};
    use url::Url;

    #[test]
    fn registry_round_trip_through_uris() {
        let share = TestShare::new();
        let uri = Url::parse(&format!("smb://{}/share/doc.txt", AUTHORITY)).unwrap();
        let path = share.provider.get_path(&uri).unwrap();
        assert_eq!(path.to_string(), "/share/doc.txt");
        assert!(Arc::ptr_eq(path.file_system(), &share.file_system));

        let looked_up = share.provider.get_file_system(&uri).unwrap();
        assert!(Arc::ptr_eq(&looked_up, &share.file_system));
    }

    #[test]
    fn closing_the_file_system_unregisters_it() {
        let share = TestShare::new();
        let uri = Url::parse(&format!("smb://{}/", AUTHORITY)).unwrap();
        share.file_system.close();
        assert!(matches!(
            share.provider.get_file_system(&uri),
            Err(SmbError::NotFound { .. })
        ));
        // The authority is free for a new registration afterwards.
        let reopened = share.provider.new_file_system(&uri, &HashMap::new()).unwrap();
        assert!(reopened.is_open());
    }

    #[test]
    fn write_then_read_round_trips_through_channels() {
        let share = TestShare::new();
        share.mkdir_all("/share");
        let path = share.path("/share/blob.bin");

        let channel = share
            .provider
            .new_byte_channel(
                &path,
                &[OpenOption::Write, OpenOption::Create],
            )
            .unwrap();
        channel.write(b"first line\n").unwrap();
        channel.write(b"second line\n").unwrap();
        channel.close().unwrap();

        let channel = share
            .provider
            .new_byte_channel(&path, &[OpenOption::Read])
            .unwrap();
        assert_eq!(channel.size().unwrap(), 23);
        let mut buf = vec![0u8; 23];
        let mut read = 0;
        while read < buf.len() {
            let n = channel.read(&mut buf[read..]).unwrap();
            assert!(n > 0);
            read += n;
        }
        assert_eq!(&buf, b"first line\nsecond line\n");
        channel.close().unwrap();
    }

    #[test]
    fn append_extends_an_existing_file() {
        let share = TestShare::new();
        share.put_file("/share/log.txt", b"one\n");
        let path = share.path("/share/log.txt");

        let channel = share
            .provider
            .new_byte_channel(&path, &[OpenOption::Append])
            .unwrap();
        channel.write(b"two\n").unwrap();
        channel.close().unwrap();

        let attrs = share.provider.read_attributes(&path).unwrap();
        assert_eq!(attrs.size(), 8);
    }

    #[test]
    fn directory_stream_resolves_children_against_the_folder() {
        let share = TestShare::new();
        share.put_file("/share/docs/a.txt", b"a");
        share.put_file("/share/docs/b.txt", b"b");
        share.mkdir_all("/share/docs/archive");

        let stream = share
            .provider
            .new_directory_stream(&share.path("/share/docs/"), None::<fn(&SmbPath) -> bool>)
            .unwrap();
        let entries: Vec<String> = stream.iter().unwrap().map(|p| p.to_string()).collect();
        assert_eq!(
            entries,
            vec![
                "/share/docs/a.txt",
                "/share/docs/archive/",
                "/share/docs/b.txt"
            ]
        );
    }

    #[test]
    fn copy_and_rename_respect_replace_semantics() {
        let share = TestShare::new();
        share.put_file("/share/src.bin", b"payload");
        share.put_file("/share/dst.bin", b"old");
        let src = share.path("/share/src.bin");
        let dst = share.path("/share/dst.bin");

        assert!(matches!(
            share.provider.copy(&src, &dst, &[]),
            Err(SmbError::AlreadyExists { .. })
        ));
        share
            .provider
            .copy(&src, &dst, &[CopyOption::ReplaceExisting, CopyOption::CopyAttributes])
            .unwrap();

        let moved = share.path("/share/moved.bin");
        share.provider.rename(&src, &moved, &[]).unwrap();
        assert!(matches!(
            share.provider.check_access(&src, &[AccessMode::Read]),
            Err(SmbError::NotFound { .. })
        ));
        share.provider.check_access(&moved, &[AccessMode::Read]).unwrap();
    }

    #[test]
    fn hidden_flag_surfaces_through_the_provider() {
        let share = TestShare::new();
        share.put_file("/share/visible.txt", b"v");
        share.put_file("/share/secret.txt", b"s");
        share.client.set_hidden(AUTHORITY, "/share/secret.txt", true);

        assert!(!share.provider.is_hidden(&share.path("/share/visible.txt")).unwrap());
        assert!(share.provider.is_hidden(&share.path("/share/secret.txt")).unwrap());
    }

    #[test]
    fn attribute_view_updates_times_selectively() {
        let share = TestShare::new();
        share.put_file("/share/stamped.bin", b"data");
        let view = share.provider.attribute_view(&share.path("/share/stamped.bin"));

        let created = SystemTime::now() - Duration::from_secs(86_400);
        view.set_times(None, None, Some(created)).unwrap();
        let attrs = view.read_attributes().unwrap();
        assert_eq!(attrs.creation_time(), created);
    }

    #[test]
    fn is_same_file_agrees_for_identical_paths_across_origins() {
        let share = TestShare::new();
        share.put_file("/share/x.bin", b"x");
        let via_fs = share.path("/share/x.bin");
        let via_uri = share
            .provider
            .get_path(&Url::parse(&format!("smb://{}/share/x.bin", AUTHORITY)).unwrap())
            .unwrap();
        assert!(share.provider.is_same_file(&via_fs, &via_uri).unwrap());
    }

    #[test]
    fn matcher_integrates_with_directory_listings() {
        let share = TestShare::new();
        share.put_file("/share/logs/app.log", b"l");
        share.put_file("/share/logs/app.txt", b"t");
        let matcher = share.file_system.path_matcher("glob:*.log").unwrap();

        let stream = share
            .provider
            .new_directory_stream(
                &share.path("/share/logs/"),
                Some(move |p: &SmbPath| matcher.matches(p)),
            )
            .unwrap();
        let entries: Vec<String> = stream.iter().unwrap().map(|p| p.to_string()).collect();
        assert_eq!(entries, vec!["/share/logs/app.log"]);
    }
}
