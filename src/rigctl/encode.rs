//! Pure encoding: RigctlCommand → wire bytes.
//!
//! No I/O, no side effects. Commands are not newline-terminated: each
//! command travels on its own connection and the teardown ends it.

use super::RigctlCommand;

/// DCD query byte (`\get_dcd` short form)
const GET_DCD: u8 = 0x8b;

/// Encode a RigctlCommand into the bytes written to the daemon.
pub fn encode(cmd: &RigctlCommand) -> Vec<u8> {
    use RigctlCommand::*;
    match cmd {
        GetPtt => b"t".to_vec(),
        GetDcd => vec![GET_DCD],
        SetPtt(on) => format!("T {}", u8::from(*on)).into_bytes(),
        GetFreq => b"f".to_vec(),
        SetFreq(hz) => format!("F {hz:10.0}").into_bytes(),
        GetSplitFreq => b"i".to_vec(),
        SetSplitFreq(hz) => format!("I {hz:10.0}").into_bytes(),
        Aos => b"AOS".to_vec(),
        Los => b"LOS".to_vec(),
        GetPos => b"p".to_vec(),
        SetPos(pos) => format!("P {:7.2} {:7.2}", pos.az, pos.el).into_bytes(),
    }
}
