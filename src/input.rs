// Input module - joypad state and the $4016/$4017 controller ports
//
// Writing 1 then 0 to $4016 latches the current button state into an 8-bit
// shift register per controller. Each read of $4016/$4017 then returns one
// button bit in the order A, B, Select, Start, Up, Down, Left, Right, with
// the open-bus pattern $40 in the upper bits. After eight reads the ports
// answer $41.

use serde::{Deserialize, Serialize};

use crate::emulator::Nes;

/// Buttons on a standard controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Joypad {
    pub a: bool,
    pub b: bool,
    pub select: bool,
    pub start: bool,
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl Joypad {
    /// Button state at a given shift position (read order)
    fn bit(&self, read_count: u8) -> bool {
        match read_count {
            0 => self.a,
            1 => self.b,
            2 => self.select,
            3 => self.start,
            4 => self.up,
            5 => self.down,
            6 => self.left,
            _ => self.right,
        }
    }
}

/// Controller port state for both pads
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Controllers {
    pub(crate) current_joypad1: Joypad,
    /// Second controller, unused by the shell but fully wired
    pub(crate) current_joypad2: Joypad,
    pub(crate) reloading: bool,
    pub(crate) reg1_read_count: u8,
    pub(crate) reg2_read_count: u8,
}

impl Controllers {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_reg(joypad: &Joypad, reloading: bool, read_count: &mut u8) -> u8 {
        if reloading {
            return 0x40 | u8::from(joypad.a);
        }
        if *read_count > 7 {
            return 0x41;
        }
        let state = joypad.bit(*read_count);
        *read_count += 1;
        0x40 | u8::from(state)
    }
}

impl Nes {
    /// $4016 write: bit 0 high starts the strobe, dropping it latches
    pub(crate) fn write_joypad_reg1(&mut self, val: u8) {
        if val & 0x01 != 0 {
            self.controllers.reloading = true;
            self.controllers.reg1_read_count = 0;
            self.controllers.reg2_read_count = 0;
        } else if self.controllers.reloading {
            self.controllers.reloading = false;
        }
    }

    pub(crate) fn read_joypad_reg1(&mut self) -> u8 {
        let ctl = &mut self.controllers;
        Controllers::read_reg(&ctl.current_joypad1, ctl.reloading, &mut ctl.reg1_read_count)
    }

    /// $4017 reads answer for controller 2; writes go to the APU frame
    /// counter instead
    pub(crate) fn read_joypad_reg2(&mut self) -> u8 {
        let ctl = &mut self.controllers;
        Controllers::read_reg(&ctl.current_joypad2, ctl.reloading, &mut ctl.reg2_read_count)
    }
}
