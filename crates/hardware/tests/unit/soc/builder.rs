//! Resource Lifecycle Unit Tests.
//!
//! Verifies acquisition order for each transport, all-or-nothing setup with
//! reverse-order release on failure, idempotent cleanup, and the `/dev/mem`
//! platform's attribute and buffer handling.

use crate::common::harness::init_tracing;
use crate::common::mocks::platform::FakePlatform;
use dramrig_core::common::{PhysAddr, RigError};
use dramrig_core::config::{PlatformConfig, RigConfig, TransportConfig, WindowSpec};
use dramrig_core::soc::memory::BufferDescriptor;
use dramrig_core::soc::transport::TransportKind;
use dramrig_core::soc::{DevMemPlatform, Platform, ResourceManager};
use pretty_assertions::assert_eq;
use std::io::Write;
use std::path::Path;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

fn trigger_config() -> RigConfig {
    RigConfig {
        transport: TransportConfig::TriggerBuffer {
            dma: WindowSpec::uncached(0x8001_0000, 0x1_0000),
            buffer: WindowSpec::uncached(0xB000_0000, 0x2000),
            packet_words: 16,
        },
        ..RigConfig::default()
    }
}

// ══════════════════════════════════════════════════════════
// 1. Successful setup
// ══════════════════════════════════════════════════════════

#[test]
fn setup_acquires_in_order() {
    init_tracing();
    let mut rig = ResourceManager::new(RigConfig::default(), FakePlatform::new());

    rig.setup().unwrap();

    assert!(rig.is_active());
    assert_eq!(
        rig.platform().events(),
        strings(&[
            "acquire:memory",
            "acquire:data-dma",
            "acquire:bridge",
            "acquire:attr:size",
            "acquire:attr:phys_addr",
            "acquire:dma-buffer",
        ])
    );

    let ctx = rig.context_mut().unwrap();
    assert_eq!(ctx.buffer().phys_addr(), PhysAddr(0x3F00_0000));
    assert_eq!(ctx.buffer().len(), 65536);
    assert_eq!(ctx.transport().kind(), TransportKind::BridgeCircular);
    assert!(ctx.gpio_mut().is_none());
}

#[test]
fn cleanup_releases_in_reverse_order_once() {
    let mut rig = ResourceManager::new(RigConfig::default(), FakePlatform::new());
    rig.setup().unwrap();

    rig.cleanup();
    rig.cleanup();

    assert!(!rig.is_active());
    assert!(rig.context_mut().is_none());
    assert_eq!(
        rig.platform().releases(),
        strings(&[
            "release:dma-buffer",
            "release:bridge",
            "release:data-dma",
            "release:memory",
        ])
    );
}

#[test]
fn setup_twice_keeps_existing_resources() {
    let mut rig = ResourceManager::new(RigConfig::default(), FakePlatform::new());
    rig.setup().unwrap();
    let acquired = rig.platform().events().len();

    rig.setup().unwrap();

    assert_eq!(rig.platform().events().len(), acquired);
}

#[test]
fn trigger_transport_releases_buffer_before_its_dma() {
    let mut rig = ResourceManager::new(trigger_config(), FakePlatform::new());
    rig.setup().unwrap();
    assert_eq!(
        rig.context_mut().unwrap().transport().kind(),
        TransportKind::TriggerBuffer
    );

    rig.cleanup();

    assert_eq!(
        rig.platform().releases(),
        strings(&[
            "release:dma-buffer",
            "release:cmd-buffer",
            "release:cmd-dma",
            "release:data-dma",
            "release:memory",
        ])
    );
}

#[test]
fn fifo_transport_maps_both_interfaces() {
    let config = RigConfig {
        transport: TransportConfig::FifoGated {
            ctrl: WindowSpec::uncached(0xB000_0000, 0x1_0000),
            data: Some(WindowSpec::uncached(0xB001_0000, 0x1_0000)),
            depth_words: 512,
        },
        ..RigConfig::default()
    };
    let mut rig = ResourceManager::new(config, FakePlatform::new());

    rig.setup().unwrap();

    let events = rig.platform().events();
    assert_eq!(
        events[2..4].to_vec(),
        strings(&["acquire:fifo-ctrl", "acquire:fifo-data"])
    );
    let ctx = rig.context_mut().unwrap();
    assert_eq!(ctx.transport().kind(), TransportKind::FifoGated);
    assert_eq!(ctx.transport().word_bytes(), 8);
}

#[test]
fn optional_windows_are_acquired_and_released() {
    let config = RigConfig {
        gpio: Some(WindowSpec::uncached(0x4120_0000, 0x1000)),
        status: Some(WindowSpec::uncached(0x4121_0000, 0x1000)),
        ..RigConfig::default()
    };
    let mut rig = ResourceManager::new(config, FakePlatform::new());
    rig.setup().unwrap();

    let ctx = rig.context_mut().unwrap();
    ctx.gpio_mut().unwrap().write(1, 0x5).unwrap();
    assert_eq!(ctx.gpio_mut().unwrap().read(1).unwrap(), 0x5);
    assert_eq!(ctx.read_status(0).unwrap(), 0);

    rig.cleanup();
    assert_eq!(
        rig.platform().releases(),
        strings(&[
            "release:dma-buffer",
            "release:status",
            "release:gpio",
            "release:bridge",
            "release:data-dma",
            "release:memory",
        ])
    );
}

#[test]
fn status_read_without_window_is_invalid() {
    let mut rig = ResourceManager::new(RigConfig::default(), FakePlatform::new());
    rig.setup().unwrap();

    let err = rig.context_mut().unwrap().read_status(0).unwrap_err();

    assert!(matches!(err, RigError::InvalidField { .. }));
}

#[test]
fn dropping_the_manager_releases_everything() {
    let platform = FakePlatform::new();
    let ledger = std::sync::Arc::clone(&platform.ledger);
    {
        let mut rig = ResourceManager::new(RigConfig::default(), platform);
        rig.setup().unwrap();
    }
    let releases: Vec<String> = ledger
        .lock()
        .unwrap()
        .events
        .iter()
        .filter(|e| e.starts_with("release:"))
        .cloned()
        .collect();
    assert_eq!(releases.len(), 4);
}

// ══════════════════════════════════════════════════════════
// 2. Partial failure
// ══════════════════════════════════════════════════════════

#[test]
fn failure_on_third_resource_releases_first_two() {
    let mut rig = ResourceManager::new(RigConfig::default(), FakePlatform::failing_at(3));

    let err = rig.setup().unwrap_err();

    assert!(matches!(
        err,
        RigError::ResourceAcquisition { ref resource, .. } if resource == "bridge"
    ));
    assert!(!rig.is_active());
    assert_eq!(
        rig.platform().events(),
        strings(&[
            "acquire:memory",
            "acquire:data-dma",
            "fail:bridge",
            "release:data-dma",
            "release:memory",
        ])
    );

    rig.cleanup();
    rig.cleanup();
    assert_eq!(rig.platform().releases().len(), 2);
}

#[test]
fn failure_mapping_buffer_releases_all_windows() {
    let mut rig = ResourceManager::new(RigConfig::default(), FakePlatform::failing_at(6));

    assert!(rig.setup().is_err());

    assert_eq!(
        rig.platform().releases(),
        strings(&["release:bridge", "release:data-dma", "release:memory"])
    );
}

#[test]
fn malformed_attribute_is_an_acquisition_failure() {
    let mut platform = FakePlatform::new();
    platform.buffer_phys = "not-hex".to_owned();
    let mut rig = ResourceManager::new(RigConfig::default(), platform);

    let err = rig.setup().unwrap_err();

    match err {
        RigError::ResourceAcquisition { resource, source } => {
            assert!(resource.ends_with("phys_addr"), "{resource}");
            assert_eq!(source.kind(), std::io::ErrorKind::InvalidData);
        }
        other => panic!("expected ResourceAcquisition, got {other}"),
    }
    assert_eq!(rig.platform().releases().len(), 3);
    assert!(!rig.platform().events().iter().any(|e| e.contains("dma-buffer")));
}

#[test]
fn cleanup_without_setup_is_harmless() {
    let mut rig = ResourceManager::new(RigConfig::default(), FakePlatform::new());
    rig.cleanup();
    assert!(rig.platform().events().is_empty());
}

// ══════════════════════════════════════════════════════════
// 3. /dev/mem platform
// ══════════════════════════════════════════════════════════

#[test]
fn devmem_reads_attribute_files() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "0x3f000000").unwrap();

    let text = DevMemPlatform.read_attribute(file.path()).unwrap();

    assert_eq!(
        BufferDescriptor::parse_phys_addr(&text).unwrap(),
        PhysAddr(0x3F00_0000)
    );
}

#[test]
fn devmem_missing_attribute_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("size");

    let err = DevMemPlatform.read_attribute(&path).unwrap_err();

    match err {
        RigError::ResourceAcquisition { resource, source } => {
            assert!(resource.ends_with("size"));
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("expected ResourceAcquisition, got {other}"),
    }
}

#[test]
fn devmem_open_fails_for_missing_device() {
    let dir = tempfile::tempdir().unwrap();
    let config = PlatformConfig {
        devmem_path: dir.path().join("mem"),
        wc_device_path: dir.path().join("wc"),
    };

    let err = DevMemPlatform.open_memory(&config).unwrap_err();

    assert!(matches!(err, RigError::ResourceAcquisition { .. }));
}

#[test]
fn devmem_maps_buffer_device() {
    let file = tempfile::NamedTempFile::new().unwrap();
    file.as_file().set_len(8192).unwrap();
    let descriptor = BufferDescriptor {
        size: 8192,
        phys_addr: PhysAddr(0x3F00_0000),
    };

    let mut window = DevMemPlatform
        .map_buffer(file.path(), descriptor)
        .unwrap();

    assert_eq!(window.size(), 8192);
    assert_eq!(window.base(), PhysAddr(0x3F00_0000));
    window.write_u32(8188, 7).unwrap();
    assert_eq!(window.read_u32(8188).unwrap(), 7);
}

#[test]
fn devmem_maps_through_memory_handle() {
    let mem = tempfile::NamedTempFile::new().unwrap();
    mem.as_file().set_len(0x3000).unwrap();
    let config = PlatformConfig {
        devmem_path: mem.path().to_path_buf(),
        wc_device_path: Path::new("/nonexistent/wc").to_path_buf(),
    };
    let mut handle = DevMemPlatform.open_memory(&config).unwrap();

    let mut window = handle
        .map("regs", &WindowSpec::uncached(0x2000, 0x100))
        .unwrap();
    window.write_u32(4, 0x1234).unwrap();
    drop(window);

    let bytes = std::fs::read(mem.path()).unwrap();
    assert_eq!(&bytes[0x2004..0x2008], &0x1234u32.to_le_bytes());
    assert!(
        handle
            .map("wc", &WindowSpec::write_combining(0xB000_0000, 0x100))
            .is_err()
    );
}
