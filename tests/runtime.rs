mod common;

use std::sync::Mutex;

use common::{init_logging, CountingAllocator};
use qreduce::config::RuntimeConfig;
use qreduce::runtime::{task_rows, Allocator, Context, DefaultAllocator};

#[test]
fn test_workers_use_configured_name_prefix() {
    init_logging();
    let config = RuntimeConfig::default()
        .with_thread_num(2)
        .with_thread_name_prefix("reduce-test");
    let ctx = Context::new(&config).unwrap();
    let names = Mutex::new(Vec::new());

    let mut dst = vec![0u8; 4];
    ctx.pool()
        .launch(&mut dst, 4, 1, |_, _, _| {
            let name = std::thread::current().name().map(str::to_owned);
            names.lock().unwrap().push(name);
            Ok(())
        })
        .unwrap();

    let names = names.into_inner().unwrap();
    assert!(!names.is_empty());
    for name in names {
        assert!(name.unwrap().starts_with("reduce-test-"));
    }
}

#[test]
fn test_context_exposes_custom_allocator() {
    let alloc = CountingAllocator::new();
    let ctx = Context::new(&RuntimeConfig::default().with_thread_num(1))
        .unwrap()
        .with_allocator(alloc.clone());

    let buffer = ctx.allocator().malloc(16).unwrap();
    assert_eq!(alloc.outstanding(), 1);
    ctx.allocator().free(buffer);
    assert_eq!(alloc.outstanding(), 0);
}

#[test]
fn test_invalid_config_is_rejected() {
    let err = Context::new(&RuntimeConfig::default().with_thread_num(0)).unwrap_err();
    assert_ne!(err.status_code(), 0);
}

#[test]
fn test_task_rows_blocks_are_contiguous() {
    let blocks: Vec<_> = (0..4).map(|t| task_rows(t, 4, 10)).collect();
    assert_eq!(blocks, vec![0..3, 3..6, 6..9, 9..10]);
    assert_eq!(task_rows(5, 4, 10), 10..10);
}

#[test]
fn test_default_allocator_is_zeroed() {
    let buf = DefaultAllocator.malloc(3).unwrap();
    assert_eq!(buf, vec![0, 0, 0]);
}
