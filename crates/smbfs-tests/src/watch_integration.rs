//! Watch-service scenarios with a live poller thread.

#[cfg(test)]
mod tests {
    use crate::harness::TestShare;
    use smbfs_provider::{SmbError, SmbWatchKey, SmbWatchService, WatchEventKind};
    use std::sync::Arc;
    use std::time::Duration;

    const POLL: Duration = Duration::from_millis(40);
    const WAIT: Duration = Duration::from_secs(5);

    fn all_kinds() -> Vec<WatchEventKind> {
        vec![
            WatchEventKind::Create,
            WatchEventKind::Modify,
            WatchEventKind::Delete,
        ]
    }

    fn take_signaled(service: &SmbWatchService) -> Arc<SmbWatchKey> {
        service
            .poll_timeout(WAIT)
            .expect("watch service closed unexpectedly")
            .expect("no key signaled within the wait budget")
    }

    #[test]
    fn file_modification_flows_through_the_service() {
        let share = TestShare::with_watch(POLL);
        share.put_file("/share/dir/file.bin", b"data");
        let service = share.file_system.new_watch_service().unwrap();
        let path = share.path("/share/dir/file.bin");
        let key = service.register(&path, &all_kinds()).unwrap();

        share.touch_later("/share/dir/file.bin", 60);
        let signaled = take_signaled(&service);
        assert!(Arc::ptr_eq(&signaled, &key));
        let events = signaled.poll_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), WatchEventKind::Modify);
        assert_eq!(events[0].context(), Some(&path));
        assert!(signaled.reset());

        share.remove("/share/dir/file.bin");
        let signaled = take_signaled(&service);
        let events = signaled.poll_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), WatchEventKind::Delete);

        service.close().unwrap();
    }

    #[test]
    fn directory_diff_flows_through_the_service() {
        let share = TestShare::with_watch(POLL);
        share.put_file("/share/dir/file.bin", b"data");
        share.mkdir_all("/share/dir/subdir");
        let service = share.file_system.new_watch_service().unwrap();
        let dir = share.path("/share/dir/");
        let key = service.register(&dir, &all_kinds()).unwrap();

        share.remove("/share/dir/file.bin");
        share.touch_later("/share/dir", 60);
        let signaled = take_signaled(&service);
        let events = signaled.poll_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), WatchEventKind::Delete);
        assert_eq!(
            events[0].context().map(|p| p.to_string()),
            Some("/share/dir/file.bin".to_string())
        );
        assert!(signaled.reset());

        share.put_file("/share/dir/file.bin", b"back");
        share.touch_later("/share/dir", 120);
        let signaled = take_signaled(&service);
        let events = signaled.poll_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), WatchEventKind::Create);
        assert!(Arc::ptr_eq(&signaled, &key));

        service.close().unwrap();
    }

    #[test]
    fn cancelled_keys_stop_reporting() {
        let share = TestShare::with_watch(POLL);
        share.put_file("/share/dir/file.bin", b"data");
        let service = share.file_system.new_watch_service().unwrap();
        let path = share.path("/share/dir/file.bin");
        let key = service.register(&path, &all_kinds()).unwrap();

        key.cancel().unwrap();
        share.touch_later("/share/dir/file.bin", 60);
        // Give the poller a few cycles; nothing may arrive.
        assert!(service
            .poll_timeout(Duration::from_millis(300))
            .unwrap()
            .is_none());

        service.close().unwrap();
    }

    #[test]
    fn repeated_modifications_coalesce_across_polls() {
        let share = TestShare::with_watch(POLL);
        share.put_file("/share/dir/file.bin", b"data");
        let service = share.file_system.new_watch_service().unwrap();
        let path = share.path("/share/dir/file.bin");
        let key = service.register(&path, &all_kinds()).unwrap();

        // Leave the key signaled while more polls accumulate events.
        share.touch_later("/share/dir/file.bin", 60);
        let signaled = take_signaled(&service);
        share.touch_later("/share/dir/file.bin", 120);
        share.touch_later("/share/dir/file.bin", 180);
        std::thread::sleep(4 * POLL);

        let events = signaled.poll_events();
        assert_eq!(events.len(), 1, "modifies on one path must coalesce");
        assert_eq!(events[0].kind(), WatchEventKind::Modify);
        assert!(events[0].count() >= 2);
        assert!(Arc::ptr_eq(&signaled, &key));

        service.close().unwrap();
    }

    #[test]
    fn closing_the_service_rejects_new_registrations() {
        let share = TestShare::with_watch(POLL);
        share.put_file("/share/dir/file.bin", b"data");
        let service = share.file_system.new_watch_service().unwrap();
        service.close().unwrap();
        let err = service
            .register(&share.path("/share/dir/file.bin"), &all_kinds())
            .unwrap_err();
        assert!(matches!(err, SmbError::ClosedWatchService));
    }

    #[test]
    fn two_watch_services_run_independently() {
        let share = TestShare::with_watch(POLL);
        share.put_file("/share/a.bin", b"a");
        share.put_file("/share/b.bin", b"b");
        let first = share.file_system.new_watch_service().unwrap();
        let second = share.file_system.new_watch_service().unwrap();
        first
            .register(&share.path("/share/a.bin"), &all_kinds())
            .unwrap();
        second
            .register(&share.path("/share/b.bin"), &all_kinds())
            .unwrap();

        share.touch_later("/share/b.bin", 60);
        let signaled = second.poll_timeout(WAIT).unwrap().unwrap();
        assert_eq!(signaled.path().to_string(), "/share/b.bin");

        first.close().unwrap();
        second.close().unwrap();
    }
}
