use pretty_assertions::assert_eq;
use w9825g6kh::controller::{Command, CommandMode, CommandTarget};
use w9825g6kh::{
    BurstLength, BurstType, CasLatency, DeviceConfig, Error, ModeRegister, OperatingMode, StatusCode,
    WriteBurstMode,
};

use crate::common::harness::rig;
use crate::common::mocks::Event;

#[test]
fn deinit_powers_down_and_detaches() {
    let mut rig = rig().attached();

    assert_eq!(rig.sdram.deinit(), Ok(()));

    assert!(!rig.sdram.is_attached());
    assert_eq!(rig.sdram.mode_register(), None);
    assert_eq!(rig.events(), vec![Event::Command(CommandMode::PowerDown)]);
}

#[test]
fn deinit_is_idempotent() {
    let mut rig = rig().attached();
    rig.sdram.deinit().unwrap();
    rig.clear();

    assert_eq!(rig.sdram.deinit(), Ok(()));
    assert!(rig.events().is_empty());

    let mut fresh = crate::common::harness::rig().build();
    assert_eq!(fresh.sdram.deinit(), Ok(()));
    assert!(fresh.events().is_empty());
}

#[test]
fn deinit_ignores_power_down_failure() {
    let mut rig = rig().fail_on(CommandMode::PowerDown).attached();

    assert_eq!(rig.sdram.deinit(), Ok(()));
    assert!(!rig.sdram.is_attached());
}

#[test]
fn commands_fail_when_detached() {
    let mut rig = rig().attached();
    rig.sdram.deinit().unwrap();
    rig.clear();

    let cmd = Command::new(CommandMode::Normal, CommandTarget::Bank1);
    assert_eq!(rig.sdram.send_command(&cmd), Err(Error::NotAttached));
    assert_eq!(rig.sdram.set_mode_register(ModeRegister::from_bits(0x0232)), Err(Error::NotAttached));
    assert_eq!(rig.sdram.set_refresh_rate(1500), Err(Error::NotAttached));
    assert_eq!(rig.sdram.enter_self_refresh(), Err(Error::NotAttached));
    assert_eq!(rig.sdram.exit_power_down(), Err(Error::NotAttached));
    assert_eq!(rig.sdram.dump_config(), Err(Error::NotAttached));
    assert!(rig.events().is_empty());
}

#[test]
fn send_command_passes_through() {
    let mut rig = rig().attached();
    let cmd = Command::auto_refresh(CommandTarget::Both, 2);

    assert_eq!(rig.sdram.send_command(&cmd), Ok(()));

    let (sent, _) = *rig.sdram.controller().commands.last().unwrap();
    assert_eq!(sent, cmd);
}

#[test]
fn send_command_reports_controller_failure() {
    let mut rig = rig().fail_on(CommandMode::SelfRefresh).attached();
    let cmd = Command::new(CommandMode::SelfRefresh, CommandTarget::Bank1);

    let result = rig.sdram.send_command(&cmd);

    assert_eq!(result, Err(Error::Command(CommandMode::SelfRefresh)));
    assert_eq!(StatusCode::from(result), StatusCode::Error);
    // a failed command does not detach
    assert!(rig.sdram.is_attached());
}

#[test]
fn set_mode_register_copies_fields_into_config() {
    let mut rig = rig().attached();
    let before = *rig.sdram.config().unwrap();
    let value = ModeRegister::new(
        BurstLength::FullPage,
        BurstType::Interleaved,
        CasLatency::Two,
        OperatingMode::Standard,
        WriteBurstMode::Programmed,
    );

    assert_eq!(rig.sdram.set_mode_register(value), Ok(()));

    let after = *rig.sdram.config().unwrap();
    assert_eq!(
        after,
        DeviceConfig {
            burst_length: BurstLength::FullPage,
            burst_type: BurstType::Interleaved,
            cas_latency: CasLatency::Two,
            write_burst_mode: WriteBurstMode::Programmed,
            ..before
        }
    );
    assert_eq!(rig.sdram.mode_register(), Some(value));
    let (load, _) = *rig.sdram.controller().commands.last().unwrap();
    assert_eq!(load.mode, CommandMode::LoadMode);
    assert_eq!(load.mode_register, 0x002f);
    // no reconciliation on this path
    assert_eq!(rig.events(), vec![Event::Command(CommandMode::LoadMode)]);
}

#[test]
fn set_mode_register_rejects_reserved_fields() {
    let mut rig = rig().attached();
    let before = *rig.sdram.config().unwrap();

    for bits in [0x0234, 0x0212, 0x02b2] {
        assert_eq!(
            rig.sdram.set_mode_register(ModeRegister::from_bits(bits)),
            Err(Error::InvalidParameter),
            "{bits:#06x}"
        );
    }

    assert!(rig.events().is_empty());
    assert_eq!(rig.sdram.config(), Some(&before));
}

#[test]
fn set_mode_register_rejects_bits_above_write_burst() {
    let mut rig = rig().attached();

    for bits in [0x0632, 0x8232, 0xFE32] {
        assert_eq!(
            rig.sdram.set_mode_register(ModeRegister::from_bits(bits)),
            Err(Error::InvalidParameter),
            "{bits:#06x}"
        );
    }

    assert!(rig.events().is_empty());
    assert_eq!(rig.sdram.mode_register(), Some(ModeRegister::from_bits(0x0232)));
}

#[test]
fn set_refresh_rate_updates_config() {
    let mut rig = rig().attached();

    assert_eq!(rig.sdram.set_refresh_rate(1500), Ok(()));

    assert_eq!(rig.sdram.config().unwrap().refresh_rate, 1500);
    assert_eq!(rig.events(), vec![Event::Refresh(1500)]);
    assert_eq!(rig.sdram.set_refresh_rate(0), Err(Error::InvalidParameter));
}

#[test]
fn power_state_commands() {
    let mut rig = rig().attached();

    rig.sdram.enter_self_refresh().unwrap();
    rig.sdram.exit_self_refresh().unwrap();
    rig.sdram.enter_power_down().unwrap();
    rig.sdram.exit_power_down().unwrap();

    assert_eq!(
        rig.events(),
        vec![
            Event::Command(CommandMode::SelfRefresh),
            Event::Command(CommandMode::Normal),
            Event::Command(CommandMode::PowerDown),
            Event::Command(CommandMode::Normal),
        ]
    );
    assert!(rig.sdram.is_attached());
}

#[test]
fn dump_config_is_read_only() {
    let rig = rig().attached();

    assert_eq!(rig.sdram.dump_config(), Ok(()));
    assert!(rig.events().is_empty());
}
