//! End-to-end scenarios: images in, observable machine state out.

use rpu::{assemble, disassemble, Bit, Instruction, Rpu, RpuSnapshot, Step, TraceRecord, MEMORY_SIZE};
use rpu::cpu::decode::encode;

#[test]
fn load_then_store_from_zeroed_memory() {
    // LOAD 5; STORE 0
    let mut rpu = Rpu::new(&[0x00, 0x05, 0x80, 0x00]);

    let first = rpu.step().unwrap();
    let second = rpu.step().unwrap();

    assert_eq!(
        first,
        Step::Executed(TraceRecord { ip: 0, instruction: Instruction::load(5).unwrap() })
    );
    assert_eq!(
        second,
        Step::Executed(TraceRecord { ip: 2, instruction: Instruction::store(0).unwrap() })
    );
    assert_eq!(rpu.current_accumulator(), Bit::Zero);
    assert_eq!(rpu.mem.read_bit(0).unwrap(), Bit::Zero);
    assert_eq!(rpu.current_ip(), 4);
}

#[test]
fn load_sees_directly_written_bit() {
    // Bit 5 lives in byte 0, so keep the LOAD clear of it
    let mut rpu = Rpu::new(&[0x00, 0x00, 0x00, 0x05]);
    rpu.regs.ip = 2;
    rpu.mem.write_bit(5, 1).unwrap();

    rpu.step().unwrap();

    assert_eq!(rpu.current_accumulator(), Bit::One);
}

#[test]
fn full_image_halts_after_last_instruction() {
    let mut image = vec![0u8; MEMORY_SIZE];
    // Last word: STORE 0x20
    image[MEMORY_SIZE - 2..].copy_from_slice(&encode(&Instruction::store(0x20).unwrap()));
    let mut rpu = Rpu::new(&image);
    rpu.regs.ip = MEMORY_SIZE - 2;

    let last = rpu.step().unwrap();
    assert!(matches!(last, Step::Executed(TraceRecord { ip, .. }) if ip == MEMORY_SIZE - 2));
    assert_eq!(rpu.current_ip(), MEMORY_SIZE);

    assert_eq!(rpu.step().unwrap(), Step::Halted);
    assert!(rpu.is_halted());
}

#[test]
fn whole_memory_runs_to_halt() {
    let mut rpu = Rpu::new(&[]);

    let records: Vec<_> = rpu.run(u64::MAX).collect::<Result<_, _>>().unwrap();

    assert_eq!(records.len(), MEMORY_SIZE / 2);
    assert_eq!(records.last().map(|r| r.ip), Some(MEMORY_SIZE - 2));
    assert!(rpu.is_halted());
}

#[test]
fn oversized_image_is_truncated() {
    let mut image = vec![0xAAu8; MEMORY_SIZE + 100];
    image[MEMORY_SIZE..].fill(0x55);

    let rpu = Rpu::new(&image);

    assert_eq!(rpu.mem.capacity(), MEMORY_SIZE);
    assert!(rpu.mem.as_bytes().iter().all(|&b| b == 0xAA));
}

#[test]
fn run_iterator_is_not_restartable() {
    let mut rpu = Rpu::with_capacity(4, &[]);

    let mut run = rpu.run(10);
    assert!(run.next().is_some());
    assert!(run.next().is_some());
    assert!(run.next().is_none());
    assert!(run.next().is_none());

    assert_eq!(rpu.run(10).count(), 0);
}

#[test]
fn trace_lines_match_cli_format() {
    let mut rpu = Rpu::new(&[0x00, 0x05, 0x80, 0x00, 0xFF, 0xFF]);

    let lines: Vec<String> = rpu
        .run(3)
        .map(|r| r.unwrap().to_string())
        .collect();

    assert_eq!(lines, vec!["0: 0 0005", "2: 1 0000", "4: 1 7fff"]);
}

#[test]
fn assembled_program_copies_a_flag() {
    let source = r#"
        ; copy bit 2 of SRC into bit 7 of DST
            LOAD SRC.2
            STORE DST.7
            ORG 0x10
        SRC: DB 0b100
        DST: DB 0
    "#;
    let image = assemble(source).unwrap();
    let mut rpu = Rpu::new(&image);

    rpu.run_limited(2).unwrap();

    assert_eq!(rpu.current_accumulator(), Bit::One);
    assert_eq!(rpu.mem.read_byte(0x11).unwrap(), 0x80);

    let listing = disassemble(&image[..4]);
    assert!(listing.contains("LOAD 0x0082"));
    assert!(listing.contains("STORE 0x008f"));
}

#[test]
fn snapshot_survives_json() {
    let mut rpu = Rpu::new(&[0x00, 0x40, 0x80, 0x41]);
    rpu.mem.write_bit(0x40, 1).unwrap();
    rpu.run_limited(2).unwrap();

    let json = rpu.snapshot().to_json().unwrap();
    let restored = Rpu::from_snapshot(&RpuSnapshot::from_json(&json).unwrap()).unwrap();

    assert_eq!(restored.current_ip(), 4);
    assert_eq!(restored.current_accumulator(), Bit::One);
    assert_eq!(restored.mem.read_bit(0x41).unwrap(), Bit::One);
    assert_eq!(restored.cycles, 2);
}
