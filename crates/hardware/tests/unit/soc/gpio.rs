//! GPIO Unit Tests.
//!
//! Verifies channel-to-register mapping and rejection of invalid channels.

use crate::common::mocks::window::{Access, RecordingWindow};
use dramrig_core::common::RigError;
use dramrig_core::soc::devices::Gpio;
use pretty_assertions::assert_eq;
use rstest::rstest;

#[rstest]
#[case(1, 0x00, 0x04)]
#[case(2, 0x08, 0x0C)]
fn channel_maps_to_data_and_tristate(#[case] channel: u8, #[case] data: usize, #[case] tri: usize) {
    let window = RecordingWindow::new("gpio", 0x4120_0000, 0x1000);
    let mut gpio = Gpio::new(window.boxed());

    gpio.write(channel, 0xAA).unwrap();
    gpio.set_direction(channel, 0xFFFF_0000).unwrap();

    assert_eq!(
        window.writes(),
        vec![
            Access::U32 {
                offset: data,
                val: 0xAA
            },
            Access::U32 {
                offset: tri,
                val: 0xFFFF_0000
            },
        ]
    );
}

#[test]
fn snapshot_reads_both_channels() {
    let window = RecordingWindow::new("gpio", 0x4120_0000, 0x1000);
    window.script(0x00, &[0x11]);
    window.script(0x08, &[0x22]);
    let mut gpio = Gpio::new(window.boxed());

    assert_eq!(gpio.snapshot().unwrap(), [0x11, 0x22]);
    assert_eq!(gpio.direction(2).unwrap(), 0);
}

#[rstest]
#[case(0)]
#[case(3)]
#[case(255)]
fn invalid_channel_is_rejected_without_access(#[case] channel: u8) {
    let window = RecordingWindow::new("gpio", 0x4120_0000, 0x1000);
    let mut gpio = Gpio::new(window.boxed());

    assert!(matches!(
        gpio.read(channel),
        Err(RigError::InvalidChannel { channel: c }) if c == channel
    ));
    assert!(gpio.write(channel, 1).is_err());
    assert!(gpio.set_direction(channel, 1).is_err());
    assert_eq!(window.write_count(), 0);
    assert_eq!(window.reads_at(0x00), 0);
}
