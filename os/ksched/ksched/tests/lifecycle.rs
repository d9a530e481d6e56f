use ksched::{Config, DevKsched, Ksched, KschedError, SimulatedKernel, TaskHandle};
use std::cell::Cell;
use std::fs;
use std::path::Path;

fn config(cores: u32) -> Config {
    Config::new().with_num_cores(cores)
}

#[test]
fn init_then_teardown_releases_the_mapping() {
    let kernel = SimulatedKernel::new(4);
    let mut ksched = Ksched::new();
    assert!(!ksched.is_initialized());

    let channel = ksched.init_with(&config(4), |_| Ok(kernel.clone())).unwrap();
    assert_eq!(channel.num_cores(), 4);
    for core in 0..4 {
        assert!(channel.is_applied(core).unwrap());
    }
    assert_eq!(kernel.live_regions(), 1);

    assert!(ksched.teardown());
    assert!(!ksched.is_initialized());
    assert_eq!(kernel.live_regions(), 0);
    assert!(!ksched.teardown(), "second teardown has nothing to release");
}

#[test]
fn double_init_fails_and_leaves_the_channel_untouched() {
    let kernel = SimulatedKernel::new(4);
    let mut ksched = Ksched::new();

    let channel = ksched.init_with(&config(4), |_| Ok(kernel.clone())).unwrap();
    let generation = channel.run(1, TaskHandle::from_tid(7).unwrap()).unwrap();
    channel.mark_pending(1).unwrap();

    let opened = Cell::new(false);
    let err = ksched
        .init_with(&config(2), |_| {
            opened.set(true);
            Ok(SimulatedKernel::new(2))
        })
        .unwrap_err();
    assert!(matches!(err, KschedError::AlreadyInitialized));
    assert!(!opened.get(), "backend must not be opened again");

    let channel = ksched.channel().unwrap();
    assert_eq!(channel.num_cores(), 4);
    assert_eq!(channel.issued_generation(1).unwrap(), generation);
    assert!(channel.pending().contains(1));
    assert_eq!(kernel.live_regions(), 1);
}

#[test]
fn reinit_after_teardown_is_allowed() {
    let kernel = SimulatedKernel::new(2);
    let mut ksched = Ksched::new();

    let channel = ksched.init_with(&config(2), |_| Ok(kernel.clone())).unwrap();
    channel.set_idle(0).unwrap();
    assert_eq!(kernel.commit_all(), 1);
    ksched.teardown();

    // the fresh channel adopts what the kernel committed
    let channel = ksched.init_with(&config(2), |_| Ok(kernel.clone())).unwrap();
    assert_eq!(channel.issued_generation(0).unwrap(), 1);
    assert!(channel.is_applied(0).unwrap());
}

#[test]
fn mapping_failure_releases_everything_and_keeps_the_context_usable() {
    let kernel = SimulatedKernel::new(4);
    kernel.refuse_mapping(true);

    let mut ksched = Ksched::new();
    let err = ksched
        .init_with(&config(4), |_| Ok(kernel.clone()))
        .unwrap_err();
    assert!(matches!(err, KschedError::MappingFailed(_)));
    assert!(!ksched.is_initialized());
    assert_eq!(kernel.live_regions(), 0);

    kernel.refuse_mapping(false);
    ksched
        .init_with(&config(4), |_| Ok(kernel.clone()))
        .unwrap();
    assert!(ksched.is_initialized());
}

#[test]
fn invalid_config_is_rejected_before_opening() {
    let mut ksched = Ksched::<SimulatedKernel>::new();
    let err = ksched
        .init_with(&config(0), |_| panic!("must not open with a bad config"))
        .unwrap_err();
    assert!(matches!(err, KschedError::InvalidConfig(_)));
}

#[test]
fn missing_device_is_reported_as_unavailable() {
    let mut ksched = Ksched::<DevKsched>::new();
    let path = std::env::temp_dir().join("ksched-test-does-not-exist/ksched");
    let err = ksched
        .init(&Config::new().with_device_path(&path))
        .unwrap_err();

    match err {
        KschedError::ChannelUnavailable { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!ksched.is_initialized());
}

fn open_descriptors_on(target: &Path) -> usize {
    fs::read_dir("/proc/self/fd")
        .unwrap()
        .filter_map(Result::ok)
        .filter(|entry| fs::read_link(entry.path()).is_ok_and(|link| link == target))
        .count()
}

#[test]
fn unmappable_device_releases_its_handle() {
    // /dev/null opens and locks like the real node but has no mmap
    let null = Path::new("/dev/null");
    let before = open_descriptors_on(null);

    let mut ksched = Ksched::<DevKsched>::new();
    let err = ksched
        .init(&Config::new().with_device_path(null).with_num_cores(1))
        .unwrap_err();
    assert!(matches!(err, KschedError::MappingFailed(_)));
    assert!(!ksched.is_initialized());
    assert_eq!(open_descriptors_on(null), before);

    // the exclusive lock went with the descriptor
    let owner = DevKsched::open(null).unwrap();
    assert!(matches!(DevKsched::open(null), Err(KschedError::ChannelBusy)));
    drop(owner);
    assert_eq!(open_descriptors_on(null), before);
}
