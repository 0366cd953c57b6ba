//! Thread-safety tests for the shared structures: the registry, byte
//! channels, watch keys and the watch-service deque.

#[cfg(test)]
mod tests {
    use crate::harness::TestShare;
    use smbfs_provider::{OpenOption, SmbError, WatchEventKind, MAX_EVENT_LIST_SIZE};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;
    use url::Url;

    #[test]
    fn racing_get_or_create_converges_on_one_handle() {
        let share = TestShare::new();
        let uri = Url::parse("smb://racer@elsewhere/").unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let provider = Arc::clone(&share.provider);
            let uri = uri.clone();
            handles.push(thread::spawn(move || {
                provider
                    .get_or_create_file_system(&uri, &HashMap::new())
                    .unwrap()
            }));
        }
        let file_systems: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for fs in &file_systems[1..] {
            assert!(Arc::ptr_eq(fs, &file_systems[0]));
        }
    }

    #[test]
    fn racing_new_file_system_admits_exactly_one() {
        let share = TestShare::new();
        let uri = Url::parse("smb://racer@elsewhere/").unwrap();

        let successes = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let provider = Arc::clone(&share.provider);
            let uri = uri.clone();
            let successes = Arc::clone(&successes);
            handles.push(thread::spawn(move || {
                match provider.new_file_system(&uri, &HashMap::new()) {
                    Ok(_) => {
                        successes.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(SmbError::AlreadyExists { .. }) => {}
                    Err(other) => panic!("unexpected error: {:?}", other),
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(successes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn channel_operations_serialize_behind_the_handle_mutex() {
        let share = TestShare::new();
        share.put_file("/share/shared.bin", &[0u8; 64]);
        let channel = Arc::new(
            share
                .provider
                .new_byte_channel(
                    &share.path("/share/shared.bin"),
                    &[OpenOption::Read, OpenOption::Write],
                )
                .unwrap(),
        );

        let mut handles = Vec::new();
        for _ in 0..4 {
            let channel = Arc::clone(&channel);
            handles.push(thread::spawn(move || {
                for _ in 0..50 {
                    channel.set_position(0).unwrap();
                    channel.write(&[1u8; 16]).unwrap();
                    channel.set_position(0).unwrap();
                    let mut buf = [0u8; 16];
                    let mut read = 0;
                    while read < buf.len() {
                        let n = channel.read(&mut buf[read..]).unwrap();
                        assert!(n > 0);
                        read += n;
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(channel.size().unwrap(), 64);
        channel.close().unwrap();
    }

    #[test]
    fn concurrent_signals_preserve_the_total_event_count() {
        let share = TestShare::with_watch(Duration::from_secs(600));
        share.put_file("/share/dir/file.bin", b"x");
        let service = share.file_system.new_watch_service().unwrap();
        let key = service
            .register(
                &share.path("/share/dir/"),
                &[WatchEventKind::Create, WatchEventKind::Modify, WatchEventKind::Delete],
            )
            .unwrap();

        // Every producer hammers modifies on its own child path.
        let mut handles = Vec::new();
        for worker in 0..4 {
            let share_path = share.path(&format!("/share/dir/w{}.bin", worker));
            let key = Arc::clone(&key);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    key.signal_event(WatchEventKind::Modify, Some(share_path.clone()));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let events = key.poll_events();
        assert!(events.len() <= MAX_EVENT_LIST_SIZE);
        let total: u64 = events.iter().map(|e| e.count()).sum();
        assert_eq!(total, 400, "every signal must be counted exactly once");

        service.close().unwrap();
    }

    #[test]
    fn producers_and_consumers_share_the_service_deque() {
        let share = TestShare::with_watch(Duration::from_millis(30));
        for i in 0..4 {
            share.put_file(&format!("/share/dir/f{}.bin", i), b"x");
        }
        let service = Arc::new(share.file_system.new_watch_service().unwrap());

        let mut keys = Vec::new();
        for i in 0..4 {
            keys.push(
                service
                    .register(
                        &share.path(&format!("/share/dir/f{}.bin", i)),
                        &[WatchEventKind::Modify],
                    )
                    .unwrap(),
            );
        }
        for i in 0..4 {
            share.touch_later(&format!("/share/dir/f{}.bin", i), 60);
        }

        let delivered = Arc::new(AtomicUsize::new(0));
        let mut consumers = Vec::new();
        for _ in 0..2 {
            let service = Arc::clone(&service);
            let delivered = Arc::clone(&delivered);
            consumers.push(thread::spawn(move || {
                while delivered.load(Ordering::SeqCst) < 4 {
                    match service.poll_timeout(Duration::from_millis(100)) {
                        Ok(Some(key)) => {
                            if !key.poll_events().is_empty() {
                                delivered.fetch_add(1, Ordering::SeqCst);
                            }
                            key.reset();
                        }
                        Ok(None) => {}
                        Err(_) => break,
                    }
                }
            }));
        }
        for consumer in consumers {
            consumer.join().unwrap();
        }
        assert_eq!(delivered.load(Ordering::SeqCst), 4);

        service.close().unwrap();
    }
}
