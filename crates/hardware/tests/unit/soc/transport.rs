//! Command Transport Unit Tests.
//!
//! Verifies framing of command plus padding for each transport, circular
//! index wrap-around, FIFO vacancy gating, and rejection of oversize packets
//! before any register is touched.

use crate::common::mocks::window::{Access, RecordingWindow};
use dramrig_core::common::RigError;
use dramrig_core::soc::devices::DmaEngine;
use dramrig_core::soc::devices::dma::{regs, sr};
use dramrig_core::soc::transport::fifo::{REG_ISR, REG_TDFD, REG_TDFR, REG_TDFV, REG_TLR, RESET_KEY};
use dramrig_core::soc::transport::{
    BridgeTransport, CommandTransport, FifoTransport, TransportKind, TriggerTransport, WordWidth,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const CMD: u32 = 0x0000_0412;

fn bridge(slots: usize, width: WordWidth) -> (RecordingWindow, BridgeTransport) {
    let window = RecordingWindow::new("bridge", 0xB000_0000, slots * width.bytes());
    let transport = BridgeTransport::new(window.boxed(), width).unwrap();
    (window, transport)
}

// ══════════════════════════════════════════════════════════
// 1. Bridge circular window
// ══════════════════════════════════════════════════════════

#[test]
fn bridge_writes_command_then_padding() {
    let (window, mut t) = bridge(8, WordWidth::Bits64);

    t.send(CMD, 2).unwrap();

    assert_eq!(
        window.writes(),
        vec![
            Access::U64 {
                offset: 0,
                val: u64::from(CMD)
            },
            Access::U64 { offset: 8, val: 0 },
            Access::U64 { offset: 16, val: 0 },
        ]
    );
    assert_eq!(t.index(), 3);
}

#[test]
fn bridge_wraps_padding_around_the_window() {
    let (window, mut t) = bridge(8, WordWidth::Bits64);

    t.send(CMD, 5).unwrap();
    t.send(CMD, 3).unwrap();

    // Second packet starts at slot 6 and wraps through 7, 0, 1.
    let offsets: Vec<usize> = window.writes()[6..].iter().map(Access::offset).collect();
    assert_eq!(offsets, vec![48, 56, 0, 8]);
    assert_eq!(t.index(), 2);
}

#[test]
fn bridge_32bit_slots_use_32bit_writes() {
    let (window, mut t) = bridge(16, WordWidth::Bits32);

    t.send(CMD, 1).unwrap();

    assert_eq!(
        window.writes(),
        vec![
            Access::U32 {
                offset: 0,
                val: CMD
            },
            Access::U32 { offset: 4, val: 0 },
        ]
    );
    assert_eq!(t.capacity_words(), 16);
    assert_eq!(t.capacity_bytes(), 64);
}

#[test]
fn bridge_full_window_packet_is_accepted() {
    let (_, mut t) = bridge(8, WordWidth::Bits64);

    t.send(CMD, 7).unwrap();

    assert_eq!(t.index(), 0);
}

#[test]
fn bridge_rejects_oversize_packet_without_writes() {
    let (window, mut t) = bridge(8, WordWidth::Bits64);
    t.send(CMD, 1).unwrap();
    let before = window.write_count();

    let err = t.send(CMD, 8).unwrap_err();

    match err {
        RigError::PacketTooLong {
            words,
            word_bytes,
            capacity_bytes,
        } => {
            assert_eq!(words, 9);
            assert_eq!(word_bytes, 8);
            assert_eq!(capacity_bytes, 64);
        }
        other => panic!("expected PacketTooLong, got {other}"),
    }
    assert_eq!(window.write_count(), before);
    assert_eq!(t.index(), 2);
}

#[test]
fn bridge_rejects_window_without_a_slot() {
    let window = RecordingWindow::new("bridge", 0xB000_0000, 4);
    let err = BridgeTransport::new(window.boxed(), WordWidth::Bits64).unwrap_err();
    assert!(matches!(err, RigError::InvalidField { .. }));
}

proptest! {
    #[test]
    fn bridge_index_is_sum_of_packet_lengths_mod_capacity(
        slots in 1usize..64,
        intervals in prop::collection::vec(0u32..64, 0..40),
    ) {
        let (_, mut t) = bridge(slots, WordWidth::Bits64);
        let mut total = 0usize;
        for interval in intervals {
            if (interval as usize) < slots {
                t.send(CMD, interval).unwrap();
                total += 1 + interval as usize;
            } else {
                prop_assert!(t.send(CMD, interval).is_err());
            }
            prop_assert!(t.index() < slots);
        }
        prop_assert_eq!(t.index(), total % slots);
    }
}

// ══════════════════════════════════════════════════════════
// 2. Trigger buffer
// ══════════════════════════════════════════════════════════

fn trigger() -> (RecordingWindow, RecordingWindow, TriggerTransport) {
    let buffer = RecordingWindow::new("cmd-buffer", 0xB000_0000, 0x2000);
    let dma_regs =
        RecordingWindow::new("cmd-dma", 0x8001_0000, 0x1_0000).with_default_read(u64::from(sr::IDLE));
    let dma = DmaEngine::new(dma_regs.boxed(), 100);
    let t = TriggerTransport::new(buffer.boxed(), dma, 16).unwrap();
    (buffer, dma_regs, t)
}

#[test]
fn trigger_clears_packet_at_construction() {
    let (buffer, _, _) = trigger();

    let writes = buffer.writes();
    assert_eq!(writes.len(), 16);
    assert!(
        writes
            .iter()
            .all(|a| matches!(a, Access::U32 { val: 0, .. }))
    );
}

#[test]
fn trigger_writes_slot_zero_and_streams_fixed_packet() {
    let (buffer, dma_regs, mut t) = trigger();

    t.send(CMD, 4).unwrap();
    t.send(CMD + 1, 0).unwrap();

    assert_eq!(
        buffer.writes_at(0),
        vec![0, u64::from(CMD), u64::from(CMD + 1)]
    );
    assert_eq!(dma_regs.writes_at(regs::MM2S_SA), vec![0xB000_0000; 2]);
    assert_eq!(dma_regs.writes_at(regs::MM2S_LENGTH), vec![64, 64]);
}

#[test]
fn trigger_rejects_interval_beyond_packet() {
    let (buffer, dma_regs, mut t) = trigger();
    let before = buffer.write_count();

    let err = t.send(CMD, 16).unwrap_err();

    assert!(matches!(err, RigError::PacketTooLong { words: 17, .. }));
    assert_eq!(buffer.write_count(), before);
    assert_eq!(dma_regs.write_count(), 0);
}

#[test]
fn trigger_rejects_packet_larger_than_buffer() {
    let buffer = RecordingWindow::new("cmd-buffer", 0xB000_0000, 32);
    let dma = DmaEngine::new(RecordingWindow::new("cmd-dma", 0, 0x100).boxed(), 1);
    assert!(TriggerTransport::new(buffer.boxed(), dma, 16).is_err());
}

// ══════════════════════════════════════════════════════════
// 3. FIFO gated
// ══════════════════════════════════════════════════════════

fn fifo(depth: u32, with_data: bool) -> (RecordingWindow, RecordingWindow, FifoTransport) {
    let ctrl = RecordingWindow::new("fifo-ctrl", 0xB000_0000, 0x1_0000).with_default_read(1024);
    let data = RecordingWindow::new("fifo-data", 0xB001_0000, 0x1_0000);
    let t = FifoTransport::new(
        ctrl.boxed(),
        with_data.then(|| data.boxed()),
        depth,
        50,
    );
    (ctrl, data, t)
}

#[test]
fn fifo_waits_for_vacancy_then_releases_packet() {
    let (ctrl, data, mut t) = fifo(512, true);
    ctrl.script(REG_TDFV, &[0, 2, 512]);

    t.send(CMD, 3).unwrap();

    assert_eq!(ctrl.reads_at(REG_TDFV), 3);
    assert_eq!(data.writes_at(0), vec![u64::from(CMD), 0, 0, 0]);
    assert!(
        data.writes()
            .iter()
            .all(|a| matches!(a, Access::U64 { .. }))
    );
    assert_eq!(ctrl.writes_at(REG_TLR), vec![32]);
}

#[test]
fn fifo_without_data_window_uses_lite_port() {
    let (ctrl, data, mut t) = fifo(512, false);

    t.send(CMD, 2).unwrap();

    assert_eq!(ctrl.writes_at(REG_TDFD), vec![u64::from(CMD), 0, 0]);
    assert_eq!(ctrl.writes_at(REG_TLR), vec![12]);
    assert_eq!(data.write_count(), 0);
    assert_eq!(t.word_bytes(), 4);
}

#[test]
fn fifo_length_is_written_last() {
    let (ctrl, _, mut t) = fifo(512, false);

    t.send(CMD, 1).unwrap();

    let last = ctrl.writes().last().copied();
    assert_eq!(last, Some(Access::U32 { offset: REG_TLR, val: 8 }));
}

#[test]
fn fifo_vacancy_timeout_writes_nothing() {
    let (ctrl, data, mut t) = fifo(512, true);
    ctrl.script(REG_TDFV, &[1]);

    let err = t.send(CMD, 3).unwrap_err();

    assert!(err.is_timeout());
    assert!(matches!(
        err,
        RigError::FifoVacancyTimeout {
            needed: 4,
            vacancy: 1,
            polls: 50
        }
    ));
    assert_eq!(data.write_count(), 0);
    assert_eq!(ctrl.write_count(), 0);
}

#[test]
fn fifo_rejects_packet_deeper_than_fifo() {
    let (ctrl, data, mut t) = fifo(4, true);

    let err = t.send(CMD, 4).unwrap_err();

    assert!(matches!(err, RigError::PacketTooLong { words: 5, .. }));
    assert_eq!(ctrl.write_count() + data.write_count(), 0);
    assert_eq!(ctrl.reads_at(REG_TDFV), 0);
}

#[test]
fn fifo_rejects_packet_whose_byte_count_exceeds_length_register() {
    let (ctrl, data, mut t) = fifo(u32::MAX, true);
    assert_eq!(t.capacity_bytes(), u32::MAX as usize);

    let err = t.send(CMD, 0x2000_0000).unwrap_err();

    assert!(matches!(
        err,
        RigError::PacketTooLong {
            words: 0x2000_0001,
            word_bytes: 8,
            ..
        }
    ));
    assert_eq!(ctrl.write_count() + data.write_count(), 0);
    assert_eq!(ctrl.reads_at(REG_TDFV), 0);
    assert_eq!(CommandTransport::FifoGated(t).max_interval(), 0x1FFF_FFFE);
}

#[test]
fn fifo_reset_writes_key_then_clears_interrupts() {
    let (ctrl, _, mut t) = fifo(512, true);

    t.reset().unwrap();

    assert_eq!(
        ctrl.writes(),
        vec![
            Access::U32 {
                offset: REG_TDFR,
                val: RESET_KEY
            },
            Access::U32 {
                offset: REG_ISR,
                val: 0xFFFF_FFFF
            },
        ]
    );
    assert_eq!(t.vacancy().unwrap(), 1024);
}

// ══════════════════════════════════════════════════════════
// 4. Tagged transport
// ══════════════════════════════════════════════════════════

#[test]
fn command_transport_reports_shape() {
    let (_, b) = bridge(8, WordWidth::Bits64);
    let bridge = CommandTransport::BridgeCircular(b);
    assert_eq!(bridge.kind(), TransportKind::BridgeCircular);
    assert_eq!(bridge.word_bytes(), 8);
    assert_eq!(bridge.max_interval(), 7);

    let (_, _, t) = trigger();
    let trigger = CommandTransport::TriggerBuffer(t);
    assert_eq!(trigger.kind(), TransportKind::TriggerBuffer);
    assert_eq!(trigger.capacity_bytes(), 64);
    assert_eq!(trigger.max_interval(), 15);

    let (_, _, f) = fifo(512, true);
    let fifo = CommandTransport::FifoGated(f);
    assert_eq!(fifo.kind(), TransportKind::FifoGated);
    assert_eq!(fifo.capacity_bytes(), 4096);
    assert_eq!(fifo.max_interval(), 511);
}

#[test]
fn command_transport_rejects_oversize_for_every_variant() {
    let (bw, b) = bridge(8, WordWidth::Bits64);
    let (tb, td, t) = trigger();
    let trigger_writes = tb.write_count();
    let (fc, fd, f) = fifo(8, true);

    let mut transports = [
        CommandTransport::BridgeCircular(b),
        CommandTransport::TriggerBuffer(t),
        CommandTransport::FifoGated(f),
    ];
    for t in &mut transports {
        let interval = t.max_interval() + 1;
        assert!(matches!(
            t.send(CMD, interval),
            Err(RigError::PacketTooLong { .. })
        ));
    }

    assert_eq!(bw.write_count(), 0);
    assert_eq!(tb.write_count(), trigger_writes);
    assert_eq!(td.write_count(), 0);
    assert_eq!(fc.write_count() + fd.write_count(), 0);
}
