// Opcode dispatch and ALU flag helpers
//
// One match arm per opcode. Every instruction funnels through a small set
// of helpers that commit the register or memory effect, advance PC, and
// charge the documented cycle count (plus page-cross and branch penalties)
// through `run_cycles`.

use super::flags;
use crate::emulator::Nes;

/// Register targets for the load-and-flag helper
#[derive(Clone, Copy)]
pub(crate) enum Reg {
    A,
    X,
    Y,
    S,
    P,
}

/// Mnemonics indexed by opcode, for trace output
pub const OPCODE_NAMES: [&str; 256] = [
    "BRK", "ORA", "XXX", "XXX", "XXX", "ORA", "ASL", "XXX", "PHP", "ORA", "ASL", "XXX", "XXX",
    "ORA", "ASL", "XXX", "BPL", "ORA", "XXX", "XXX", "XXX", "ORA", "ASL", "XXX", "CLC", "ORA",
    "XXX", "XXX", "XXX", "ORA", "ASL", "XXX", "JSR", "AND", "XXX", "XXX", "BIT", "AND", "ROL",
    "XXX", "PLP", "AND", "ROL", "XXX", "BIT", "AND", "ROL", "XXX", "BMI", "AND", "XXX", "XXX",
    "XXX", "AND", "ROL", "XXX", "SEC", "AND", "XXX", "XXX", "XXX", "AND", "ROL", "XXX", "RTI",
    "EOR", "XXX", "XXX", "XXX", "EOR", "LSR", "XXX", "PHA", "EOR", "LSR", "XXX", "JMP", "EOR",
    "LSR", "XXX", "BVC", "EOR", "XXX", "XXX", "XXX", "EOR", "LSR", "XXX", "CLI", "EOR", "XXX",
    "XXX", "XXX", "EOR", "LSR", "XXX", "RTS", "ADC", "XXX", "XXX", "XXX", "ADC", "ROR", "XXX",
    "PLA", "ADC", "ROR", "XXX", "JMP", "ADC", "ROR", "XXX", "BVS", "ADC", "XXX", "XXX", "XXX",
    "ADC", "ROR", "XXX", "SEI", "ADC", "XXX", "XXX", "XXX", "ADC", "ROR", "XXX", "XXX", "STA",
    "XXX", "XXX", "STY", "STA", "STX", "XXX", "DEY", "XXX", "TXA", "XXX", "STY", "STA", "STX",
    "XXX", "BCC", "STA", "XXX", "XXX", "STY", "STA", "STX", "XXX", "TYA", "STA", "TXS", "XXX",
    "XXX", "STA", "XXX", "XXX", "LDY", "LDA", "LDX", "XXX", "LDY", "LDA", "LDX", "XXX", "TAY",
    "LDA", "TAX", "XXX", "LDY", "LDA", "LDX", "XXX", "BCS", "LDA", "XXX", "XXX", "LDY", "LDA",
    "LDX", "XXX", "CLV", "LDA", "TSX", "XXX", "LDY", "LDA", "LDX", "XXX", "CPY", "CMP", "XXX",
    "XXX", "CPY", "CMP", "DEC", "XXX", "INY", "CMP", "DEX", "XXX", "CPY", "CMP", "DEC", "XXX",
    "BNE", "CMP", "XXX", "XXX", "XXX", "CMP", "DEC", "XXX", "CLD", "CMP", "XXX", "XXX", "XXX",
    "CMP", "DEC", "XXX", "CPX", "SBC", "XXX", "XXX", "CPX", "SBC", "INC", "XXX", "INX", "SBC",
    "NOP", "XXX", "CPX", "SBC", "INC", "XXX", "BEQ", "SBC", "XXX", "XXX", "XXX", "SBC", "INC",
    "XXX", "SED", "SBC", "XXX", "XXX", "XXX", "SBC", "INC", "XXX",
];

impl Nes {
    /// Commit an instruction: run its effect, advance PC, charge cycles
    fn op_fn(&mut self, cycles: u32, inst_len: u16, f: impl FnOnce(&mut Nes)) {
        f(self);
        self.cpu.pc = self.cpu.pc.wrapping_add(inst_len);
        self.run_cycles(cycles);
    }

    /// Load a register, then set N/Z when the instruction asks for it
    fn set_reg_op(&mut self, cycles: u32, inst_len: u16, reg: Reg, val: u8, set_zn: bool) {
        match reg {
            Reg::A => self.cpu.a = val,
            Reg::X => self.cpu.x = val,
            Reg::Y => self.cpu.y = val,
            Reg::S => self.cpu.s = val,
            Reg::P => self.cpu.p = val,
        }
        self.cpu.pc = self.cpu.pc.wrapping_add(inst_len);
        self.run_cycles(cycles);
        if set_zn {
            self.set_zero_neg(val);
        }
    }

    /// Store a value to memory, then set N/Z when the instruction asks
    fn store_op(&mut self, cycles: u32, inst_len: u16, addr: u16, val: u8, set_zn: bool) {
        self.write(addr, val);
        self.cpu.pc = self.cpu.pc.wrapping_add(inst_len);
        self.run_cycles(cycles);
        if set_zn {
            self.set_zero_neg(val);
        }
    }

    fn cmp_op(&mut self, cycles: u32, inst_len: u16, reg: u8, val: u8) {
        self.run_cycles(cycles);
        self.cpu.pc = self.cpu.pc.wrapping_add(inst_len);
        self.set_zero_neg(reg.wrapping_sub(val));
        self.set_carry_flag(reg >= val);
    }

    fn jmp_op(&mut self, cycles: u32, new_pc: u16) {
        self.run_cycles(cycles);
        self.cpu.pc = new_pc;
    }

    /// Relative branch: 2 cycles untaken, 3 taken, 4 when the target sits
    /// on a different page
    fn branch_rel(&mut self, test: bool) {
        if test {
            let offs = self.read(self.cpu.pc.wrapping_add(1)) as i8;
            let new_pc = self
                .cpu
                .pc
                .wrapping_add(2)
                .wrapping_add(offs as u16);
            if new_pc & 0xFF00 != self.cpu.pc & 0xFF00 {
                self.run_cycles(4);
            } else {
                self.run_cycles(3);
            }
            self.cpu.pc = new_pc;
        } else {
            self.op_fn(2, 2, |_| {});
        }
    }

    pub(crate) fn set_zero_neg(&mut self, val: u8) {
        if val == 0 {
            self.cpu.p |= flags::ZERO;
        } else {
            self.cpu.p &= !flags::ZERO;
        }
        if val & 0x80 != 0 {
            self.cpu.p |= flags::NEG;
        } else {
            self.cpu.p &= !flags::NEG;
        }
    }

    fn set_flag_if(&mut self, flag: u8, test: bool) {
        if test {
            self.cpu.p |= flag;
        } else {
            self.cpu.p &= !flag;
        }
    }

    fn set_carry_flag(&mut self, test: bool) {
        self.set_flag_if(flags::CARRY, test);
    }

    fn set_overflow_flag(&mut self, test: bool) {
        self.set_flag_if(flags::OVERFLOW, test);
    }

    fn set_zero_flag(&mut self, test: bool) {
        self.set_flag_if(flags::ZERO, test);
    }

    fn adc_and_set_flags(&mut self, val: u8) -> u8 {
        let carry = i32::from(self.cpu.p & flags::CARRY);
        let big = i32::from(self.cpu.a) + i32::from(val) + carry;
        let signed = i32::from(self.cpu.a as i8) + i32::from(val as i8) + carry;
        let result = big as u8;
        self.set_overflow_flag(!(-128..=127).contains(&signed));
        self.set_carry_flag(big > 0xFF);
        self.set_zero_neg(result);
        result
    }

    /// SBC subtracts the operand and the complement of carry (carry acts
    /// as NOT borrow); C is set when no borrow happened
    fn sbc_and_set_flags(&mut self, val: u8) -> u8 {
        let borrow = i32::from(self.cpu.p & flags::CARRY == 0);
        let big = i32::from(self.cpu.a) - i32::from(val) - borrow;
        let signed = i32::from(self.cpu.a as i8) - i32::from(val as i8) - borrow;
        let result = big as u8;
        self.set_overflow_flag(!(-128..=127).contains(&signed));
        self.set_carry_flag(big >= 0);
        self.set_zero_neg(result);
        result
    }

    fn asl_and_set_flags(&mut self, val: u8) -> u8 {
        let result = val << 1;
        self.set_carry_flag(val & 0x80 != 0);
        self.set_zero_neg(result);
        result
    }

    fn lsr_and_set_flags(&mut self, val: u8) -> u8 {
        let result = val >> 1;
        self.set_carry_flag(val & 0x01 != 0);
        self.set_zero_neg(result);
        result
    }

    fn rol_and_set_flags(&mut self, val: u8) -> u8 {
        let mut result = val << 1;
        if self.cpu.p & flags::CARRY != 0 {
            result |= 0x01;
        }
        self.set_carry_flag(val & 0x80 != 0);
        self.set_zero_neg(result);
        result
    }

    fn ror_and_set_flags(&mut self, val: u8) -> u8 {
        let mut result = val >> 1;
        if self.cpu.p & flags::CARRY != 0 {
            result |= 0x80;
        }
        self.set_carry_flag(val & 0x01 != 0);
        self.set_zero_neg(result);
        result
    }

    /// BIT copies operand bits 7 and 6 into N and V, Z from A AND operand
    fn bit_and_set_flags(&mut self, val: u8) {
        self.cpu.p &= !0xC0;
        self.cpu.p |= val & 0xC0;
        let a = self.cpu.a;
        self.set_zero_flag(a & val == 0);
    }

    /// Hook for tolerated undocumented opcodes (the multi-byte NOP set)
    fn undocumented_opcode(&mut self) {}

    /// An undocumented opcode outside the tolerated set
    fn illegal_opcode(&mut self, opcode: u8) {
        if self.config.strict_illegal {
            panic!(
                "undocumented opcode 0x{:02x} at 0x{:04x}",
                opcode, self.cpu.pc
            );
        }
        // Lax mode: treat as a 1-byte NOP
        self.op_fn(2, 1, |_| {});
    }

    /// Execute one instruction at PC
    pub(crate) fn step_opcode(&mut self) {
        let opcode = self.read(self.cpu.pc);
        match opcode {
            0x00 => {
                // BRK
                self.op_fn(7, 1, |nes| nes.cpu.brk = true);
            }
            0x01 => {
                // ORA (indirect,x)
                let addr = self.get_x_pre_indexed_addr();
                let val = self.cpu.a | self.read(addr);
                self.set_reg_op(6, 2, Reg::A, val, true);
            }
            0x04 => self.op_fn(3, 2, Nes::undocumented_opcode), // 2-nop (UNDOCUMENTED)
            0x05 => {
                // ORA zeropage
                let addr = self.get_zero_page_addr();
                let val = self.cpu.a | self.read(addr);
                self.set_reg_op(3, 2, Reg::A, val, true);
            }
            0x06 => {
                // ASL zeropage
                let addr = self.get_zero_page_addr();
                let orig = self.read(addr);
                let val = self.asl_and_set_flags(orig);
                self.store_op(5, 2, addr, val, false);
            }
            0x08 => {
                // PHP
                self.op_fn(3, 1, |nes| {
                    let p = nes.cpu.p | flags::ON_STACK | flags::BRK;
                    nes.push(p);
                });
            }
            0x09 => {
                // ORA imm
                let val = self.cpu.a | self.read(self.cpu.pc.wrapping_add(1));
                self.set_reg_op(2, 2, Reg::A, val, true);
            }
            0x0A => {
                // ASL A
                let val = self.asl_and_set_flags(self.cpu.a);
                self.op_fn(2, 1, |nes| nes.cpu.a = val);
            }
            0x0C => self.op_fn(4, 3, Nes::undocumented_opcode), // 3-nop (UNDOCUMENTED)
            0x0D => {
                // ORA absolute
                let addr = self.get_absolute_addr();
                let val = self.cpu.a | self.read(addr);
                self.set_reg_op(4, 3, Reg::A, val, true);
            }
            0x0E => {
                // ASL absolute
                let addr = self.get_absolute_addr();
                let orig = self.read(addr);
                let val = self.asl_and_set_flags(orig);
                self.store_op(6, 3, addr, val, false);
            }

            0x10 => self.branch_rel(self.cpu.p & flags::NEG == 0), // BPL
            0x11 => {
                // ORA (indirect),y
                let (addr, extra) = self.get_y_post_indexed_addr();
                let val = self.cpu.a | self.read(addr);
                self.set_reg_op(5 + extra, 2, Reg::A, val, true);
            }
            0x14 => self.op_fn(4, 2, Nes::undocumented_opcode), // 2-nop (UNDOCUMENTED)
            0x15 => {
                // ORA zeropage,x
                let addr = self.get_indexed_zero_page_addr(self.cpu.x);
                let val = self.cpu.a | self.read(addr);
                self.set_reg_op(4, 2, Reg::A, val, true);
            }
            0x16 => {
                // ASL zeropage,x
                let addr = self.get_indexed_zero_page_addr(self.cpu.x);
                let orig = self.read(addr);
                let val = self.asl_and_set_flags(orig);
                self.store_op(6, 2, addr, val, false);
            }
            0x18 => self.op_fn(2, 1, |nes| nes.cpu.p &= !flags::CARRY), // CLC
            0x19 => {
                // ORA absolute,y
                let (addr, extra) = self.get_indexed_absolute_addr(self.cpu.y);
                let val = self.cpu.a | self.read(addr);
                self.set_reg_op(4 + extra, 3, Reg::A, val, true);
            }
            0x1A => self.op_fn(2, 1, Nes::undocumented_opcode), // 1-nop (UNDOCUMENTED)
            0x1C => {
                // 3-nop (UNDOCUMENTED)
                let (_, extra) = self.get_indexed_absolute_addr(self.cpu.x);
                self.op_fn(4 + extra, 3, Nes::undocumented_opcode);
            }
            0x1D => {
                // ORA absolute,x
                let (addr, extra) = self.get_indexed_absolute_addr(self.cpu.x);
                let val = self.cpu.a | self.read(addr);
                self.set_reg_op(4 + extra, 3, Reg::A, val, true);
            }
            0x1E => {
                // ASL absolute,x
                let (addr, _) = self.get_indexed_absolute_addr(self.cpu.x);
                let orig = self.read(addr);
                let val = self.asl_and_set_flags(orig);
                self.store_op(7, 3, addr, val, false);
            }

            0x20 => {
                // JSR
                let ret = self.cpu.pc.wrapping_add(2);
                self.push16(ret);
                let addr = self.get_absolute_addr();
                self.jmp_op(6, addr);
            }
            0x21 => {
                // AND (indirect,x)
                let addr = self.get_x_pre_indexed_addr();
                let val = self.cpu.a & self.read(addr);
                self.set_reg_op(6, 2, Reg::A, val, true);
            }
            0x24 => {
                // BIT zeropage
                let addr = self.get_zero_page_addr();
                let val = self.read(addr);
                self.op_fn(3, 2, |nes| nes.bit_and_set_flags(val));
            }
            0x25 => {
                // AND zeropage
                let addr = self.get_zero_page_addr();
                let val = self.cpu.a & self.read(addr);
                self.set_reg_op(3, 2, Reg::A, val, true);
            }
            0x26 => {
                // ROL zeropage
                let addr = self.get_zero_page_addr();
                let orig = self.read(addr);
                let val = self.rol_and_set_flags(orig);
                self.store_op(5, 2, addr, val, false);
            }
            0x28 => {
                // PLP
                let val = self.pop() & !(flags::BRK | flags::ON_STACK);
                self.set_reg_op(4, 1, Reg::P, val, false);
            }
            0x29 => {
                // AND imm
                let val = self.cpu.a & self.read(self.cpu.pc.wrapping_add(1));
                self.set_reg_op(2, 2, Reg::A, val, true);
            }
            0x2A => {
                // ROL A
                let val = self.rol_and_set_flags(self.cpu.a);
                self.op_fn(2, 1, |nes| nes.cpu.a = val);
            }
            0x2C => {
                // BIT absolute
                let addr = self.get_absolute_addr();
                let val = self.read(addr);
                self.op_fn(4, 3, |nes| nes.bit_and_set_flags(val));
            }
            0x2D => {
                // AND absolute
                let addr = self.get_absolute_addr();
                let val = self.cpu.a & self.read(addr);
                self.set_reg_op(4, 3, Reg::A, val, true);
            }
            0x2E => {
                // ROL absolute
                let addr = self.get_absolute_addr();
                let orig = self.read(addr);
                let val = self.rol_and_set_flags(orig);
                self.store_op(6, 3, addr, val, false);
            }

            0x30 => self.branch_rel(self.cpu.p & flags::NEG != 0), // BMI
            0x31 => {
                // AND (indirect),y
                let (addr, extra) = self.get_y_post_indexed_addr();
                let val = self.cpu.a & self.read(addr);
                self.set_reg_op(5 + extra, 2, Reg::A, val, true);
            }
            0x34 => self.op_fn(4, 2, Nes::undocumented_opcode), // 2-nop (UNDOCUMENTED)
            0x35 => {
                // AND zeropage,x
                let addr = self.get_indexed_zero_page_addr(self.cpu.x);
                let val = self.cpu.a & self.read(addr);
                self.set_reg_op(4, 2, Reg::A, val, true);
            }
            0x36 => {
                // ROL zeropage,x
                let addr = self.get_indexed_zero_page_addr(self.cpu.x);
                let orig = self.read(addr);
                let val = self.rol_and_set_flags(orig);
                self.store_op(6, 2, addr, val, false);
            }
            0x38 => self.op_fn(2, 1, |nes| nes.cpu.p |= flags::CARRY), // SEC
            0x39 => {
                // AND absolute,y
                let (addr, extra) = self.get_indexed_absolute_addr(self.cpu.y);
                let val = self.cpu.a & self.read(addr);
                self.set_reg_op(4 + extra, 3, Reg::A, val, true);
            }
            0x3A => self.op_fn(2, 1, Nes::undocumented_opcode), // 1-nop (UNDOCUMENTED)
            0x3C => {
                // 3-nop (UNDOCUMENTED)
                let (_, extra) = self.get_indexed_absolute_addr(self.cpu.x);
                self.op_fn(4 + extra, 3, Nes::undocumented_opcode);
            }
            0x3D => {
                // AND absolute,x
                let (addr, extra) = self.get_indexed_absolute_addr(self.cpu.x);
                let val = self.cpu.a & self.read(addr);
                self.set_reg_op(4 + extra, 3, Reg::A, val, true);
            }
            0x3E => {
                // ROL absolute,x
                let (addr, _) = self.get_indexed_absolute_addr(self.cpu.x);
                let orig = self.read(addr);
                let val = self.rol_and_set_flags(orig);
                self.store_op(7, 3, addr, val, false);
            }

            0x40 => {
                // RTI
                let p = self.pop() & !(flags::BRK | flags::ON_STACK);
                self.cpu.p = p;
                self.cpu.last_steps_p = p; // no lag from RTI
                self.op_fn(6, 0, |nes| nes.cpu.pc = nes.pop16());
            }
            0x41 => {
                // EOR (indirect,x)
                let addr = self.get_x_pre_indexed_addr();
                let val = self.cpu.a ^ self.read(addr);
                self.set_reg_op(6, 2, Reg::A, val, true);
            }
            0x44 => self.op_fn(3, 2, Nes::undocumented_opcode), // 2-nop (UNDOCUMENTED)
            0x45 => {
                // EOR zeropage
                let addr = self.get_zero_page_addr();
                let val = self.cpu.a ^ self.read(addr);
                self.set_reg_op(3, 2, Reg::A, val, true);
            }
            0x46 => {
                // LSR zeropage
                let addr = self.get_zero_page_addr();
                let orig = self.read(addr);
                let val = self.lsr_and_set_flags(orig);
                self.store_op(5, 2, addr, val, false);
            }
            0x48 => {
                // PHA
                self.op_fn(3, 1, |nes| {
                    let a = nes.cpu.a;
                    nes.push(a);
                });
            }
            0x49 => {
                // EOR imm
                let val = self.cpu.a ^ self.read(self.cpu.pc.wrapping_add(1));
                self.set_reg_op(2, 2, Reg::A, val, true);
            }
            0x4A => {
                // LSR A
                let val = self.lsr_and_set_flags(self.cpu.a);
                self.op_fn(2, 1, |nes| nes.cpu.a = val);
            }
            0x4C => {
                // JMP absolute
                let addr = self.get_absolute_addr();
                self.jmp_op(3, addr);
            }
            0x4D => {
                // EOR absolute
                let addr = self.get_absolute_addr();
                let val = self.cpu.a ^ self.read(addr);
                self.set_reg_op(4, 3, Reg::A, val, true);
            }
            0x4E => {
                // LSR absolute
                let addr = self.get_absolute_addr();
                let orig = self.read(addr);
                let val = self.lsr_and_set_flags(orig);
                self.store_op(6, 3, addr, val, false);
            }

            0x50 => self.branch_rel(self.cpu.p & flags::OVERFLOW == 0), // BVC
            0x51 => {
                // EOR (indirect),y
                let (addr, extra) = self.get_y_post_indexed_addr();
                let val = self.cpu.a ^ self.read(addr);
                self.set_reg_op(5 + extra, 2, Reg::A, val, true);
            }
            0x54 => self.op_fn(4, 2, Nes::undocumented_opcode), // 2-nop (UNDOCUMENTED)
            0x55 => {
                // EOR zeropage,x
                let addr = self.get_indexed_zero_page_addr(self.cpu.x);
                let val = self.cpu.a ^ self.read(addr);
                self.set_reg_op(4, 2, Reg::A, val, true);
            }
            0x56 => {
                // LSR zeropage,x
                let addr = self.get_indexed_zero_page_addr(self.cpu.x);
                let orig = self.read(addr);
                let val = self.lsr_and_set_flags(orig);
                self.store_op(6, 2, addr, val, false);
            }
            0x58 => self.op_fn(2, 1, |nes| nes.cpu.p &= !flags::IRQ_DISABLED), // CLI
            0x59 => {
                // EOR absolute,y
                let (addr, extra) = self.get_indexed_absolute_addr(self.cpu.y);
                let val = self.cpu.a ^ self.read(addr);
                self.set_reg_op(4 + extra, 3, Reg::A, val, true);
            }
            0x5A => self.op_fn(2, 1, Nes::undocumented_opcode), // 1-nop (UNDOCUMENTED)
            0x5C => {
                // 3-nop (UNDOCUMENTED)
                let (_, extra) = self.get_indexed_absolute_addr(self.cpu.x);
                self.op_fn(4 + extra, 3, Nes::undocumented_opcode);
            }
            0x5D => {
                // EOR absolute,x
                let (addr, extra) = self.get_indexed_absolute_addr(self.cpu.x);
                let val = self.cpu.a ^ self.read(addr);
                self.set_reg_op(4 + extra, 3, Reg::A, val, true);
            }
            0x5E => {
                // LSR absolute,x
                let (addr, _) = self.get_indexed_absolute_addr(self.cpu.x);
                let orig = self.read(addr);
                let val = self.lsr_and_set_flags(orig);
                self.store_op(7, 3, addr, val, false);
            }

            0x60 => {
                // RTS
                self.op_fn(6, 1, |nes| nes.cpu.pc = nes.pop16());
            }
            0x61 => {
                // ADC (indirect,x)
                let addr = self.get_x_pre_indexed_addr();
                let val = self.read(addr);
                self.op_fn(6, 2, |nes| nes.cpu.a = nes.adc_and_set_flags(val));
            }
            0x64 => self.op_fn(3, 2, Nes::undocumented_opcode), // 2-nop (UNDOCUMENTED)
            0x65 => {
                // ADC zeropage
                let addr = self.get_zero_page_addr();
                let val = self.read(addr);
                self.op_fn(3, 2, |nes| nes.cpu.a = nes.adc_and_set_flags(val));
            }
            0x66 => {
                // ROR zeropage
                let addr = self.get_zero_page_addr();
                let orig = self.read(addr);
                let val = self.ror_and_set_flags(orig);
                self.store_op(5, 2, addr, val, false);
            }
            0x68 => {
                // PLA
                let val = self.pop();
                self.set_reg_op(4, 1, Reg::A, val, true);
            }
            0x69 => {
                // ADC imm
                let val = self.read(self.cpu.pc.wrapping_add(1));
                self.op_fn(2, 2, |nes| nes.cpu.a = nes.adc_and_set_flags(val));
            }
            0x6A => {
                // ROR A
                let val = self.ror_and_set_flags(self.cpu.a);
                self.op_fn(2, 1, |nes| nes.cpu.a = val);
            }
            0x6C => {
                // JMP (indirect)
                let addr = self.get_indirect_jmp_addr();
                self.jmp_op(5, addr);
            }
            0x6D => {
                // ADC absolute
                let addr = self.get_absolute_addr();
                let val = self.read(addr);
                self.op_fn(4, 3, |nes| nes.cpu.a = nes.adc_and_set_flags(val));
            }
            0x6E => {
                // ROR absolute
                let addr = self.get_absolute_addr();
                let orig = self.read(addr);
                let val = self.ror_and_set_flags(orig);
                self.store_op(6, 3, addr, val, false);
            }

            0x70 => self.branch_rel(self.cpu.p & flags::OVERFLOW != 0), // BVS
            0x71 => {
                // ADC (indirect),y
                let (addr, extra) = self.get_y_post_indexed_addr();
                let val = self.read(addr);
                self.op_fn(5 + extra, 2, |nes| nes.cpu.a = nes.adc_and_set_flags(val));
            }
            0x74 => self.op_fn(4, 2, Nes::undocumented_opcode), // 2-nop (UNDOCUMENTED)
            0x75 => {
                // ADC zeropage,x
                let addr = self.get_indexed_zero_page_addr(self.cpu.x);
                let val = self.read(addr);
                self.op_fn(4, 2, |nes| nes.cpu.a = nes.adc_and_set_flags(val));
            }
            0x76 => {
                // ROR zeropage,x
                let addr = self.get_indexed_zero_page_addr(self.cpu.x);
                let orig = self.read(addr);
                let val = self.ror_and_set_flags(orig);
                self.store_op(6, 2, addr, val, false);
            }
            0x78 => self.op_fn(2, 1, |nes| nes.cpu.p |= flags::IRQ_DISABLED), // SEI
            0x79 => {
                // ADC absolute,y
                let (addr, extra) = self.get_indexed_absolute_addr(self.cpu.y);
                let val = self.read(addr);
                self.op_fn(4 + extra, 3, |nes| nes.cpu.a = nes.adc_and_set_flags(val));
            }
            0x7A => self.op_fn(2, 1, Nes::undocumented_opcode), // 1-nop (UNDOCUMENTED)
            0x7C => {
                // 3-nop (UNDOCUMENTED)
                let (_, extra) = self.get_indexed_absolute_addr(self.cpu.x);
                self.op_fn(4 + extra, 3, Nes::undocumented_opcode);
            }
            0x7D => {
                // ADC absolute,x
                let (addr, extra) = self.get_indexed_absolute_addr(self.cpu.x);
                let val = self.read(addr);
                self.op_fn(4 + extra, 3, |nes| nes.cpu.a = nes.adc_and_set_flags(val));
            }
            0x7E => {
                // ROR absolute,x
                let (addr, _) = self.get_indexed_absolute_addr(self.cpu.x);
                let orig = self.read(addr);
                let val = self.ror_and_set_flags(orig);
                self.store_op(7, 3, addr, val, false);
            }

            0x80 => self.op_fn(2, 2, Nes::undocumented_opcode), // 2-nop (UNDOCUMENTED)
            0x81 => {
                // STA (indirect,x)
                let addr = self.get_x_pre_indexed_addr();
                let val = self.cpu.a;
                self.store_op(6, 2, addr, val, false);
            }
            0x82 => self.op_fn(2, 2, Nes::undocumented_opcode), // 2-nop (UNDOCUMENTED)
            0x84 => {
                // STY zeropage
                let addr = self.get_zero_page_addr();
                let val = self.cpu.y;
                self.store_op(3, 2, addr, val, false);
            }
            0x85 => {
                // STA zeropage
                let addr = self.get_zero_page_addr();
                let val = self.cpu.a;
                self.store_op(3, 2, addr, val, false);
            }
            0x86 => {
                // STX zeropage
                let addr = self.get_zero_page_addr();
                let val = self.cpu.x;
                self.store_op(3, 2, addr, val, false);
            }
            0x88 => {
                // DEY
                let val = self.cpu.y.wrapping_sub(1);
                self.set_reg_op(2, 1, Reg::Y, val, true);
            }
            0x89 => self.op_fn(2, 2, Nes::undocumented_opcode), // 2-nop (UNDOCUMENTED)
            0x8A => {
                // TXA
                let val = self.cpu.x;
                self.set_reg_op(2, 1, Reg::A, val, true);
            }
            0x8C => {
                // STY absolute
                let addr = self.get_absolute_addr();
                let val = self.cpu.y;
                self.store_op(4, 3, addr, val, false);
            }
            0x8D => {
                // STA absolute
                let addr = self.get_absolute_addr();
                let val = self.cpu.a;
                self.store_op(4, 3, addr, val, false);
            }
            0x8E => {
                // STX absolute
                let addr = self.get_absolute_addr();
                let val = self.cpu.x;
                self.store_op(4, 3, addr, val, false);
            }

            0x90 => self.branch_rel(self.cpu.p & flags::CARRY == 0), // BCC
            0x91 => {
                // STA (indirect),y - stores always pay the index cycle
                let (addr, _) = self.get_y_post_indexed_addr();
                let val = self.cpu.a;
                self.store_op(6, 2, addr, val, false);
            }
            0x94 => {
                // STY zeropage,x
                let addr = self.get_indexed_zero_page_addr(self.cpu.x);
                let val = self.cpu.y;
                self.store_op(4, 2, addr, val, false);
            }
            0x95 => {
                // STA zeropage,x
                let addr = self.get_indexed_zero_page_addr(self.cpu.x);
                let val = self.cpu.a;
                self.store_op(4, 2, addr, val, false);
            }
            0x96 => {
                // STX zeropage,y
                let addr = self.get_indexed_zero_page_addr(self.cpu.y);
                let val = self.cpu.x;
                self.store_op(4, 2, addr, val, false);
            }
            0x98 => {
                // TYA
                let val = self.cpu.y;
                self.set_reg_op(2, 1, Reg::A, val, true);
            }
            0x99 => {
                // STA absolute,y
                let (addr, _) = self.get_indexed_absolute_addr(self.cpu.y);
                let val = self.cpu.a;
                self.store_op(5, 3, addr, val, false);
            }
            0x9A => {
                // TXS
                let val = self.cpu.x;
                self.set_reg_op(2, 1, Reg::S, val, false);
            }
            0x9D => {
                // STA absolute,x
                let (addr, _) = self.get_indexed_absolute_addr(self.cpu.x);
                let val = self.cpu.a;
                self.store_op(5, 3, addr, val, false);
            }

            0xA0 => {
                // LDY imm
                let val = self.read(self.cpu.pc.wrapping_add(1));
                self.set_reg_op(2, 2, Reg::Y, val, true);
            }
            0xA1 => {
                // LDA (indirect,x)
                let addr = self.get_x_pre_indexed_addr();
                let val = self.read(addr);
                self.set_reg_op(6, 2, Reg::A, val, true);
            }
            0xA2 => {
                // LDX imm
                let val = self.read(self.cpu.pc.wrapping_add(1));
                self.set_reg_op(2, 2, Reg::X, val, true);
            }
            0xA4 => {
                // LDY zeropage
                let addr = self.get_zero_page_addr();
                let val = self.read(addr);
                self.set_reg_op(3, 2, Reg::Y, val, true);
            }
            0xA5 => {
                // LDA zeropage
                let addr = self.get_zero_page_addr();
                let val = self.read(addr);
                self.set_reg_op(3, 2, Reg::A, val, true);
            }
            0xA6 => {
                // LDX zeropage
                let addr = self.get_zero_page_addr();
                let val = self.read(addr);
                self.set_reg_op(3, 2, Reg::X, val, true);
            }
            0xA8 => {
                // TAY
                let val = self.cpu.a;
                self.set_reg_op(2, 1, Reg::Y, val, true);
            }
            0xA9 => {
                // LDA imm
                let val = self.read(self.cpu.pc.wrapping_add(1));
                self.set_reg_op(2, 2, Reg::A, val, true);
            }
            0xAA => {
                // TAX
                let val = self.cpu.a;
                self.set_reg_op(2, 1, Reg::X, val, true);
            }
            0xAC => {
                // LDY absolute
                let addr = self.get_absolute_addr();
                let val = self.read(addr);
                self.set_reg_op(4, 3, Reg::Y, val, true);
            }
            0xAD => {
                // LDA absolute
                let addr = self.get_absolute_addr();
                let val = self.read(addr);
                self.set_reg_op(4, 3, Reg::A, val, true);
            }
            0xAE => {
                // LDX absolute
                let addr = self.get_absolute_addr();
                let val = self.read(addr);
                self.set_reg_op(4, 3, Reg::X, val, true);
            }

            0xB0 => self.branch_rel(self.cpu.p & flags::CARRY != 0), // BCS
            0xB1 => {
                // LDA (indirect),y
                let (addr, extra) = self.get_y_post_indexed_addr();
                let val = self.read(addr);
                self.set_reg_op(5 + extra, 2, Reg::A, val, true);
            }
            0xB4 => {
                // LDY zeropage,x
                let addr = self.get_indexed_zero_page_addr(self.cpu.x);
                let val = self.read(addr);
                self.set_reg_op(4, 2, Reg::Y, val, true);
            }
            0xB5 => {
                // LDA zeropage,x
                let addr = self.get_indexed_zero_page_addr(self.cpu.x);
                let val = self.read(addr);
                self.set_reg_op(4, 2, Reg::A, val, true);
            }
            0xB6 => {
                // LDX zeropage,y
                let addr = self.get_indexed_zero_page_addr(self.cpu.y);
                let val = self.read(addr);
                self.set_reg_op(4, 2, Reg::X, val, true);
            }
            0xB8 => self.op_fn(2, 1, |nes| nes.cpu.p &= !flags::OVERFLOW), // CLV
            0xB9 => {
                // LDA absolute,y
                let (addr, extra) = self.get_indexed_absolute_addr(self.cpu.y);
                let val = self.read(addr);
                self.set_reg_op(4 + extra, 3, Reg::A, val, true);
            }
            0xBA => {
                // TSX
                let val = self.cpu.s;
                self.set_reg_op(2, 1, Reg::X, val, true);
            }
            0xBC => {
                // LDY absolute,x
                let (addr, extra) = self.get_indexed_absolute_addr(self.cpu.x);
                let val = self.read(addr);
                self.set_reg_op(4 + extra, 3, Reg::Y, val, true);
            }
            0xBD => {
                // LDA absolute,x
                let (addr, extra) = self.get_indexed_absolute_addr(self.cpu.x);
                let val = self.read(addr);
                self.set_reg_op(4 + extra, 3, Reg::A, val, true);
            }
            0xBE => {
                // LDX absolute,y
                let (addr, extra) = self.get_indexed_absolute_addr(self.cpu.y);
                let val = self.read(addr);
                self.set_reg_op(4 + extra, 3, Reg::X, val, true);
            }

            0xC0 => {
                // CPY imm
                let val = self.read(self.cpu.pc.wrapping_add(1));
                self.cmp_op(2, 2, self.cpu.y, val);
            }
            0xC1 => {
                // CMP (indirect,x)
                let addr = self.get_x_pre_indexed_addr();
                let val = self.read(addr);
                self.cmp_op(6, 2, self.cpu.a, val);
            }
            0xC2 => self.op_fn(2, 2, Nes::undocumented_opcode), // 2-nop (UNDOCUMENTED)
            0xC4 => {
                // CPY zeropage
                let addr = self.get_zero_page_addr();
                let val = self.read(addr);
                self.cmp_op(3, 2, self.cpu.y, val);
            }
            0xC5 => {
                // CMP zeropage
                let addr = self.get_zero_page_addr();
                let val = self.read(addr);
                self.cmp_op(3, 2, self.cpu.a, val);
            }
            0xC6 => {
                // DEC zeropage
                let addr = self.get_zero_page_addr();
                let val = self.read(addr).wrapping_sub(1);
                self.store_op(5, 2, addr, val, true);
            }
            0xC8 => {
                // INY
                let val = self.cpu.y.wrapping_add(1);
                self.set_reg_op(2, 1, Reg::Y, val, true);
            }
            0xC9 => {
                // CMP imm
                let val = self.read(self.cpu.pc.wrapping_add(1));
                self.cmp_op(2, 2, self.cpu.a, val);
            }
            0xCA => {
                // DEX
                let val = self.cpu.x.wrapping_sub(1);
                self.set_reg_op(2, 1, Reg::X, val, true);
            }
            0xCC => {
                // CPY absolute
                let addr = self.get_absolute_addr();
                let val = self.read(addr);
                self.cmp_op(4, 3, self.cpu.y, val);
            }
            0xCD => {
                // CMP absolute
                let addr = self.get_absolute_addr();
                let val = self.read(addr);
                self.cmp_op(4, 3, self.cpu.a, val);
            }
            0xCE => {
                // DEC absolute
                let addr = self.get_absolute_addr();
                let val = self.read(addr).wrapping_sub(1);
                self.store_op(6, 3, addr, val, true);
            }

            0xD0 => self.branch_rel(self.cpu.p & flags::ZERO == 0), // BNE
            0xD1 => {
                // CMP (indirect),y
                let (addr, extra) = self.get_y_post_indexed_addr();
                let val = self.read(addr);
                self.cmp_op(5 + extra, 2, self.cpu.a, val);
            }
            0xD4 => self.op_fn(4, 2, Nes::undocumented_opcode), // 2-nop (UNDOCUMENTED)
            0xD5 => {
                // CMP zeropage,x
                let addr = self.get_indexed_zero_page_addr(self.cpu.x);
                let val = self.read(addr);
                self.cmp_op(4, 2, self.cpu.a, val);
            }
            0xD6 => {
                // DEC zeropage,x
                let addr = self.get_indexed_zero_page_addr(self.cpu.x);
                let val = self.read(addr).wrapping_sub(1);
                self.store_op(6, 2, addr, val, true);
            }
            0xD8 => self.op_fn(2, 1, |nes| nes.cpu.p &= !flags::DECIMAL), // CLD
            0xD9 => {
                // CMP absolute,y
                let (addr, extra) = self.get_indexed_absolute_addr(self.cpu.y);
                let val = self.read(addr);
                self.cmp_op(4 + extra, 3, self.cpu.a, val);
            }
            0xDA => self.op_fn(2, 1, Nes::undocumented_opcode), // 1-nop (UNDOCUMENTED)
            0xDC => {
                // 3-nop (UNDOCUMENTED)
                let (_, extra) = self.get_indexed_absolute_addr(self.cpu.x);
                self.op_fn(4 + extra, 3, Nes::undocumented_opcode);
            }
            0xDD => {
                // CMP absolute,x
                let (addr, extra) = self.get_indexed_absolute_addr(self.cpu.x);
                let val = self.read(addr);
                self.cmp_op(4 + extra, 3, self.cpu.a, val);
            }
            0xDE => {
                // DEC absolute,x
                let (addr, _) = self.get_indexed_absolute_addr(self.cpu.x);
                let val = self.read(addr).wrapping_sub(1);
                self.store_op(7, 3, addr, val, true);
            }

            0xE0 => {
                // CPX imm
                let val = self.read(self.cpu.pc.wrapping_add(1));
                self.cmp_op(2, 2, self.cpu.x, val);
            }
            0xE1 => {
                // SBC (indirect,x)
                let addr = self.get_x_pre_indexed_addr();
                let val = self.read(addr);
                self.op_fn(6, 2, |nes| nes.cpu.a = nes.sbc_and_set_flags(val));
            }
            0xE2 => self.op_fn(2, 2, Nes::undocumented_opcode), // 2-nop (UNDOCUMENTED)
            0xE4 => {
                // CPX zeropage
                let addr = self.get_zero_page_addr();
                let val = self.read(addr);
                self.cmp_op(3, 2, self.cpu.x, val);
            }
            0xE5 => {
                // SBC zeropage
                let addr = self.get_zero_page_addr();
                let val = self.read(addr);
                self.op_fn(3, 2, |nes| nes.cpu.a = nes.sbc_and_set_flags(val));
            }
            0xE6 => {
                // INC zeropage
                let addr = self.get_zero_page_addr();
                let val = self.read(addr).wrapping_add(1);
                self.store_op(5, 2, addr, val, true);
            }
            0xE8 => {
                // INX
                let val = self.cpu.x.wrapping_add(1);
                self.set_reg_op(2, 1, Reg::X, val, true);
            }
            0xE9 => {
                // SBC imm
                let val = self.read(self.cpu.pc.wrapping_add(1));
                self.op_fn(2, 2, |nes| nes.cpu.a = nes.sbc_and_set_flags(val));
            }
            0xEA => self.op_fn(2, 1, |_| {}), // NOP
            0xEB => {
                // sbc-alt imm (UNDOCUMENTED)
                let val = self.read(self.cpu.pc.wrapping_add(1));
                self.op_fn(2, 2, |nes| nes.cpu.a = nes.sbc_and_set_flags(val));
            }
            0xEC => {
                // CPX absolute
                let addr = self.get_absolute_addr();
                let val = self.read(addr);
                self.cmp_op(4, 3, self.cpu.x, val);
            }
            0xED => {
                // SBC absolute
                let addr = self.get_absolute_addr();
                let val = self.read(addr);
                self.op_fn(4, 3, |nes| nes.cpu.a = nes.sbc_and_set_flags(val));
            }
            0xEE => {
                // INC absolute
                let addr = self.get_absolute_addr();
                let val = self.read(addr).wrapping_add(1);
                self.store_op(6, 3, addr, val, true);
            }

            0xF0 => self.branch_rel(self.cpu.p & flags::ZERO != 0), // BEQ
            0xF1 => {
                // SBC (indirect),y
                let (addr, extra) = self.get_y_post_indexed_addr();
                let val = self.read(addr);
                self.op_fn(5 + extra, 2, |nes| nes.cpu.a = nes.sbc_and_set_flags(val));
            }
            0xF4 => self.op_fn(4, 2, Nes::undocumented_opcode), // 2-nop (UNDOCUMENTED)
            0xF5 => {
                // SBC zeropage,x
                let addr = self.get_indexed_zero_page_addr(self.cpu.x);
                let val = self.read(addr);
                self.op_fn(4, 2, |nes| nes.cpu.a = nes.sbc_and_set_flags(val));
            }
            0xF6 => {
                // INC zeropage,x
                let addr = self.get_indexed_zero_page_addr(self.cpu.x);
                let val = self.read(addr).wrapping_add(1);
                self.store_op(6, 2, addr, val, true);
            }
            0xF8 => self.op_fn(2, 1, |nes| nes.cpu.p |= flags::DECIMAL), // SED
            0xF9 => {
                // SBC absolute,y
                let (addr, extra) = self.get_indexed_absolute_addr(self.cpu.y);
                let val = self.read(addr);
                self.op_fn(4 + extra, 3, |nes| nes.cpu.a = nes.sbc_and_set_flags(val));
            }
            0xFA => self.op_fn(2, 1, Nes::undocumented_opcode), // 1-nop (UNDOCUMENTED)
            0xFC => {
                // 3-nop (UNDOCUMENTED)
                let (_, extra) = self.get_indexed_absolute_addr(self.cpu.x);
                self.op_fn(4 + extra, 3, Nes::undocumented_opcode);
            }
            0xFD => {
                // SBC absolute,x
                let (addr, extra) = self.get_indexed_absolute_addr(self.cpu.x);
                let val = self.read(addr);
                self.op_fn(4 + extra, 3, |nes| nes.cpu.a = nes.sbc_and_set_flags(val));
            }
            0xFE => {
                // INC absolute,x
                let (addr, _) = self.get_indexed_absolute_addr(self.cpu.x);
                let val = self.read(addr).wrapping_add(1);
                self.store_op(7, 3, addr, val, true);
            }

            _ => self.illegal_opcode(opcode),
        }
    }

    /// One-line CPU status string for trace logging
    pub fn debug_status_line(&mut self) -> String {
        let opcode = self.read(self.cpu.pc);
        let b2 = self.read(self.cpu.pc.wrapping_add(1));
        let b3 = self.read(self.cpu.pc.wrapping_add(2));
        format!(
            "Steps: {:09} PC:{:04x} *PC[:3]:{:02x}{:02x}{:02x} opcode:{} A:{:02x} X:{:02x} Y:{:02x} P:{:02x} S:{:02x}",
            self.cpu.steps,
            self.cpu.pc,
            opcode,
            b2,
            b3,
            OPCODE_NAMES[usize::from(opcode)],
            self.cpu.a,
            self.cpu.x,
            self.cpu.y,
            self.cpu.p,
            self.cpu.s,
        )
    }
}
