use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use mockall::mock;
use w9825g6kh::controller::{Command, CommandMode, SdramController, TimingRegister};
use w9825g6kh::memory::{Barrier, MappedMemory};

/// Collaborator activity, in the order the driver caused it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Event {
    Command(CommandMode),
    Delay(u32),
    TimingWrite(u32),
    Refresh(u32),
    Barrier,
}

pub type Log = Rc<RefCell<Vec<Event>>>;

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

// ============================================================================
// Recording fakes
// ============================================================================

pub struct FakeController {
    log: Log,
    /// Every command with the timeout it was sent with.
    pub commands: Vec<(Command, u32)>,
    pub fail_on: Option<CommandMode>,
    pub refresh_fails: bool,
    pub refresh: Option<u32>,
    pub cas: u8,
    /// Polls left that report busy. `u32::MAX` means busy forever.
    pub busy_polls: Cell<u32>,
    pub busy_queries: Cell<u32>,
}

impl FakeController {
    pub fn new(log: Log, cas: u8) -> Self {
        Self {
            log,
            commands: Vec::new(),
            fail_on: None,
            refresh_fails: false,
            refresh: None,
            cas,
            busy_polls: Cell::new(0),
            busy_queries: Cell::new(0),
        }
    }

    pub fn modes(&self) -> Vec<CommandMode> {
        self.commands.iter().map(|(c, _)| c.mode).collect()
    }
}

impl SdramController for FakeController {
    type Error = ();

    fn send_command(&mut self, command: &Command, timeout: u32) -> Result<(), ()> {
        self.log.borrow_mut().push(Event::Command(command.mode));
        self.commands.push((*command, timeout));
        if self.fail_on == Some(command.mode) {
            return Err(());
        }
        Ok(())
    }

    fn is_busy(&self) -> bool {
        self.busy_queries.set(self.busy_queries.get() + 1);
        match self.busy_polls.get() {
            0 => false,
            u32::MAX => true,
            n => {
                self.busy_polls.set(n - 1);
                true
            }
        }
    }

    fn program_refresh_rate(&mut self, count: u32) -> Result<(), ()> {
        self.log.borrow_mut().push(Event::Refresh(count));
        if self.refresh_fails {
            return Err(());
        }
        self.refresh = Some(count);
        Ok(())
    }

    fn cas_latency(&self) -> u8 {
        self.cas
    }
}

pub struct FakeTiming {
    log: Log,
    pub value: u32,
    pub writes: Vec<u32>,
}

impl FakeTiming {
    pub fn new(log: Log, value: u32) -> Self {
        Self {
            log,
            value,
            writes: Vec::new(),
        }
    }
}

impl TimingRegister for FakeTiming {
    fn read(&self) -> u32 {
        self.value
    }

    fn write(&mut self, value: u32) {
        self.log.borrow_mut().push(Event::TimingWrite(value));
        self.writes.push(value);
        self.value = value;
    }
}

pub struct FakeDelay {
    log: Log,
}

impl FakeDelay {
    pub fn new(log: Log) -> Self {
        Self { log }
    }
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_ms(&mut self, ms: u32) {
        self.log.borrow_mut().push(Event::Delay(ms));
    }
}

pub struct CountingBarrier {
    log: Log,
}

impl CountingBarrier {
    pub fn new(log: Log) -> Self {
        Self { log }
    }
}

impl Barrier for CountingBarrier {
    fn barrier(&mut self) {
        self.log.borrow_mut().push(Event::Barrier);
    }
}

/// Sparse byte store standing in for the 32MB window.
///
/// Unwritten bytes read as zero. Wide accesses must be aligned to the bus
/// address, like on the real bus.
pub struct SparseMemory {
    base: usize,
    bytes: HashMap<usize, u8>,
    /// Every 32-bit store, in order.
    pub word_writes: Vec<(usize, u32)>,
    /// Corrupt bit 0 when `pattern` is stored as a word at `offset`.
    pub fault: Option<(usize, u32)>,
    pub bulk_reads: Cell<u32>,
    pub bulk_writes: u32,
    pub fills: u32,
    pub wide_accesses: Cell<u32>,
}

impl SparseMemory {
    pub fn new(base: usize) -> Self {
        Self {
            base,
            bytes: HashMap::new(),
            word_writes: Vec::new(),
            fault: None,
            bulk_reads: Cell::new(0),
            bulk_writes: 0,
            fills: 0,
            wide_accesses: Cell::new(0),
        }
    }

    pub fn byte(&self, offset: usize) -> u8 {
        self.bytes.get(&offset).copied().unwrap_or(0)
    }

    pub fn is_untouched(&self) -> bool {
        self.bytes.is_empty()
    }

    fn wide(&self, offset: usize, width: usize) {
        assert_eq!(
            (self.base + offset) % width,
            0,
            "misaligned {width}-byte access at offset {offset:#x}"
        );
        self.wide_accesses.set(self.wide_accesses.get() + 1);
    }

    fn put(&mut self, offset: usize, bytes: &[u8]) {
        for (i, &b) in bytes.iter().enumerate() {
            self.bytes.insert(offset + i, b);
        }
    }
}

impl MappedMemory for SparseMemory {
    fn address(&self) -> usize {
        self.base
    }

    fn read_u8(&self, offset: usize) -> u8 {
        self.byte(offset)
    }

    fn write_u8(&mut self, offset: usize, value: u8) {
        self.bytes.insert(offset, value);
    }

    fn read_u16(&self, offset: usize) -> u16 {
        self.wide(offset, 2);
        u16::from_ne_bytes([self.byte(offset), self.byte(offset + 1)])
    }

    fn write_u16(&mut self, offset: usize, value: u16) {
        self.wide(offset, 2);
        self.put(offset, &value.to_ne_bytes());
    }

    fn read_u32(&self, offset: usize) -> u32 {
        self.wide(offset, 4);
        u32::from_ne_bytes([
            self.byte(offset),
            self.byte(offset + 1),
            self.byte(offset + 2),
            self.byte(offset + 3),
        ])
    }

    fn write_u32(&mut self, offset: usize, value: u32) {
        self.wide(offset, 4);
        self.word_writes.push((offset, value));
        let stored = match self.fault {
            Some((at, pattern)) if at == offset && pattern == value => value ^ 1,
            _ => value,
        };
        self.put(offset, &stored.to_ne_bytes());
    }

    fn read(&self, offset: usize, dst: &mut [u8]) {
        self.bulk_reads.set(self.bulk_reads.get() + 1);
        for (i, b) in dst.iter_mut().enumerate() {
            *b = self.byte(offset + i);
        }
    }

    fn write(&mut self, offset: usize, src: &[u8]) {
        self.bulk_writes += 1;
        self.put(offset, src);
    }

    fn fill(&mut self, offset: usize, len: usize, value: u8) {
        self.fills += 1;
        for i in 0..len {
            self.bytes.insert(offset + i, value);
        }
    }
}

// ============================================================================
// Strict mocks: any call without an expectation fails the test
// ============================================================================

mock! {
    pub Controller {}
    impl SdramController for Controller {
        type Error = ();
        fn send_command(&mut self, command: &Command, timeout: u32) -> Result<(), ()>;
        fn is_busy(&self) -> bool;
        fn program_refresh_rate(&mut self, count: u32) -> Result<(), ()>;
        fn cas_latency(&self) -> u8;
    }
}

mock! {
    pub Timing {}
    impl TimingRegister for Timing {
        fn read(&self) -> u32;
        fn write(&mut self, value: u32);
    }
}

mock! {
    pub Window {}
    impl MappedMemory for Window {
        fn address(&self) -> usize;
        fn read_u8(&self, offset: usize) -> u8;
        fn write_u8(&mut self, offset: usize, value: u8);
    }
}

mock! {
    pub Delay {}
    impl DelayNs for Delay {
        fn delay_ns(&mut self, ns: u32);
    }
}

mock! {
    pub Fence {}
    impl Barrier for Fence {
        fn barrier(&mut self);
    }
}
