use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use bindercall_opcode::{LookupFailure, OpcodeProvider, OpcodeTable, TransactionResolver};

struct SlowCountingProvider {
    table: OpcodeTable,
    lookups: AtomicUsize,
}

impl OpcodeProvider for SlowCountingProvider {
    fn lookup(&self, interface: &str, method: &str) -> Result<u32, LookupFailure> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        thread::sleep(std::time::Duration::from_millis(5));
        self.table.lookup(interface, method)
    }
}

#[test]
fn concurrent_misses_consult_provider_once() {
    let provider = Arc::new(SlowCountingProvider {
        table: OpcodeTable::new().with("com.example.IFoo", "foo", 7),
        lookups: AtomicUsize::new(0),
    });
    let resolver = Arc::new(TransactionResolver::new(provider.clone()));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let resolver = Arc::clone(&resolver);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                resolver.resolve("com.example.IFoo", "foo")
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().expect("resolver thread should finish"), Some(7));
    }
    assert_eq!(provider.lookups.load(Ordering::SeqCst), 1);
}

#[test]
fn table_loaded_from_file_resolves() {
    let dir = std::env::temp_dir().join(format!(
        "bindercall-opcode-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    let path = dir.join("opcodes.json");
    std::fs::write(
        &path,
        r#"{"sdk": 23, "stubs": {"com.android.internal.app.IAppOpsService$Stub": {"TRANSACTION_getOpsForPackage": 8}}}"#,
    )
    .expect("table should be writable");

    let table = OpcodeTable::from_file(&path).expect("table should load");
    let resolver = TransactionResolver::new(table);
    assert_eq!(
        resolver.resolve("com.android.internal.app.IAppOpsService", "getOpsForPackage"),
        Some(8)
    );
    assert_eq!(
        resolver.resolve("com.android.internal.app.IAppOpsService", "missing"),
        None
    );

    let _ = std::fs::remove_dir_all(&dir);
}
