// Mapper 1 (MMC1) - serial-port bank switching
//
// Memory Layout:
// - CPU $6000-$7FFF: 8KB PRG-RAM window (bankable on SOROM/SXROM boards)
// - CPU $8000-$BFFF: 16KB PRG-ROM bank (switchable or fixed by mode)
// - CPU $C000-$FFFF: 16KB PRG-ROM bank (switchable or fixed by mode)
// - PPU $0000-$0FFF / $1000-$1FFF: two 4KB CHR banks, or one 8KB bank
//
// Register Interface:
// All writes to $8000-$FFFF feed a 5-bit serial shift register, one bit per
// write. A write with bit 7 set resets the shifter and re-fixes the last
// PRG bank. On the fifth write the destination register is selected by bits
// 13-14 of the address and receives the accumulated value.

use serde::{Deserialize, Serialize};

use super::{nametable_read, nametable_write};
use crate::bus::Memory;
use crate::cartridge::Mirroring;

/// PRG-ROM banking mode (control register bits 2-3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrgBankMode {
    /// One 32KB bank at $8000
    OneBigBank,
    /// First bank fixed at $8000, switch at $C000
    FirstBankFixed,
    /// Last bank fixed at $C000, switch at $8000
    LastBankFixed,
}

/// CHR banking mode (control register bit 4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChrBankMode {
    /// One 8KB bank
    OneBank,
    /// Two independent 4KB banks
    TwoBanks,
}

/// Mapper 1 implementation (MMC1)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Mmc1 {
    vram_mirroring: Mirroring,
    shift_reg: u8,
    shift_reg_write_counter: u8,
    prg_bank_mode: PrgBankMode,
    chr_bank_mode: ChrBankMode,
    prg_bank_number: usize,
    /// 256KB-block selector for 512KB boards (SUROM)
    prg_bank_number_256: usize,
    chr_bank0_number: usize,
    chr_bank1_number: usize,
    prg_ram_bank_number: usize,
    ram_enabled: bool,
    is_chr_ram: bool,
}

impl Mmc1 {
    pub fn new(mirroring: Mirroring, is_chr_ram: bool) -> Self {
        Mmc1 {
            vram_mirroring: mirroring,
            shift_reg: 0,
            shift_reg_write_counter: 0,
            prg_bank_mode: PrgBankMode::LastBankFixed,
            chr_bank_mode: ChrBankMode::OneBank,
            prg_bank_number: 0,
            prg_bank_number_256: 0,
            chr_bank0_number: 0,
            chr_bank1_number: 0,
            prg_ram_bank_number: 0,
            ram_enabled: false,
            is_chr_ram,
        }
    }

    pub fn init(&mut self) {
        self.prg_bank_mode = PrgBankMode::LastBankFixed;
    }

    pub fn mirroring(&self) -> Mirroring {
        self.vram_mirroring
    }

    pub fn prg_bank_mode(&self) -> PrgBankMode {
        self.prg_bank_mode
    }

    pub fn chr_bank_mode(&self) -> ChrBankMode {
        self.chr_bank_mode
    }

    fn prg_ram_index(&self, mem: &Memory, addr: u16) -> usize {
        let real = 8 * 1024 * self.prg_ram_bank_number + (addr as usize - 0x6000);
        real & (mem.prg_ram.len() - 1)
    }

    pub fn cpu_read(&self, mem: &Memory, addr: u16) -> u8 {
        if (0x6000..0x8000).contains(&addr) {
            return mem.prg_ram[self.prg_ram_index(mem, addr)];
        }
        if addr >= 0x8000 {
            let block = 256 * 1024 * self.prg_bank_number_256;
            return match self.prg_bank_mode {
                PrgBankMode::OneBigBank => {
                    let real = block + 16 * 1024 * self.prg_bank_number + (addr as usize - 0x8000);
                    mem.prg_rom[real]
                }
                PrgBankMode::FirstBankFixed => {
                    if addr < 0xC000 {
                        mem.prg_rom[block + (addr as usize - 0x8000)]
                    } else {
                        let real =
                            block + 16 * 1024 * self.prg_bank_number + (addr as usize - 0xC000);
                        mem.prg_rom[real]
                    }
                }
                PrgBankMode::LastBankFixed => {
                    if addr >= 0xC000 {
                        // On 512KB boards the fixed bank is the last one of
                        // the selected 256KB block
                        let last_bank_start =
                            if mem.prg_rom.len() > 256 * 1024 && self.prg_bank_number_256 == 0 {
                                256 * 1024 - 16 * 1024
                            } else {
                                mem.prg_rom.len() - 16 * 1024
                            };
                        mem.prg_rom[last_bank_start + (addr as usize - 0xC000)]
                    } else {
                        let real =
                            block + 16 * 1024 * self.prg_bank_number + (addr as usize - 0x8000);
                        mem.prg_rom[real]
                    }
                }
            };
        }
        0xFF
    }

    pub fn cpu_write(&mut self, mem: &mut Memory, addr: u16, val: u8) {
        if (0x6000..0x8000).contains(&addr) {
            let real = self.prg_ram_index(mem, addr);
            mem.prg_ram[real] = val;
        } else if addr >= 0x8000 {
            if val & 0x80 != 0 {
                self.shift_reg_write_counter = 0;
                self.shift_reg = 0;
                self.prg_bank_mode = PrgBankMode::LastBankFixed;
            } else {
                self.shift_reg |= (val & 0x01) << 4;
                self.shift_reg_write_counter += 1;
                if self.shift_reg_write_counter == 5 {
                    let reg = self.shift_reg;
                    self.write_reg(mem, addr, reg);
                    self.shift_reg_write_counter = 0;
                    self.shift_reg = 0;
                } else {
                    self.shift_reg >>= 1;
                }
            }
        }
    }

    /// Apply a completed 5-bit serial value to the register picked by the
    /// address of the final write
    fn write_reg(&mut self, mem: &Memory, addr: u16, mut val: u8) {
        match addr {
            0x8000..=0x9FFF => {
                self.vram_mirroring = match val & 0x03 {
                    0 => Mirroring::OneScreenLower,
                    1 => Mirroring::OneScreenUpper,
                    2 => Mirroring::Vertical,
                    _ => Mirroring::Horizontal,
                };
                self.prg_bank_mode = match (val >> 2) & 0x03 {
                    0 | 1 => PrgBankMode::OneBigBank,
                    2 => PrgBankMode::FirstBankFixed,
                    _ => PrgBankMode::LastBankFixed,
                };
                self.chr_bank_mode = match (val >> 4) & 0x01 {
                    0 => ChrBankMode::OneBank,
                    _ => ChrBankMode::TwoBanks,
                };
            }
            0xA000..=0xBFFF => {
                if self.chr_bank_mode == ChrBankMode::OneBank {
                    val &= !0x01;
                }
                self.chr_bank0_number = self.chr_bank_select(mem, val);
            }
            0xC000..=0xDFFF => {
                if self.chr_bank_mode != ChrBankMode::OneBank {
                    self.chr_bank1_number = self.chr_bank_select(mem, val);
                }
            }
            _ => {
                self.ram_enabled = val & 0x10 != 0;
                if self.prg_bank_mode == PrgBankMode::OneBigBank {
                    val &= !0x01;
                }
                self.prg_bank_number =
                    usize::from(val & 0x0F) & (mem.prg_rom.len() / (16 * 1024) - 1);
            }
        }
    }

    /// CHR bank registers double as PRG-256 / PRG-RAM bank selects on the
    /// large SUROM/SOROM/SXROM boards
    fn chr_bank_select(&mut self, mem: &Memory, val: u8) -> usize {
        let mut chr_bank = usize::from(val);
        if mem.prg_rom.len() > 256 * 1024 {
            self.prg_bank_number_256 = usize::from(val >> 4) & 0x01;
            chr_bank &= 0x0F;
        }
        if mem.chr.len() == 8 * 1024 {
            chr_bank &= 0x01;
            self.prg_ram_bank_number = usize::from(val >> 2) & 0x03;
        }
        chr_bank & (mem.chr.len() / (4 * 1024) - 1)
    }

    fn chr_index(&self, addr: u16) -> usize {
        if self.chr_bank_mode == ChrBankMode::OneBank || addr < 0x1000 {
            self.chr_bank0_number * 4 * 1024 + addr as usize
        } else {
            self.chr_bank1_number * 4 * 1024 + (addr as usize - 0x1000)
        }
    }

    pub fn ppu_read(&self, mem: &Memory, addr: u16) -> u8 {
        if addr < 0x2000 {
            mem.chr[self.chr_index(addr)]
        } else {
            nametable_read(mem, self.vram_mirroring, addr)
        }
    }

    pub fn ppu_write(&mut self, mem: &mut Memory, addr: u16, val: u8) {
        if addr < 0x2000 {
            if self.is_chr_ram {
                let real = self.chr_index(addr);
                mem.chr[real] = val;
            }
        } else {
            nametable_write(mem, self.vram_mirroring, addr, val);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(prg_kb: usize, chr_kb: usize) -> Memory {
        Memory {
            prg_rom: (0..prg_kb * 1024).map(|i| (i / (16 * 1024)) as u8).collect(),
            chr: (0..chr_kb * 1024).map(|i| (i / (4 * 1024)) as u8).collect(),
            prg_ram: vec![0; 8 * 1024],
            ..Memory::default()
        }
    }

    fn write_serial(m: &mut Mmc1, mem: &mut Memory, addr: u16, val: u8) {
        for i in 0..5 {
            m.cpu_write(mem, addr, (val >> i) & 0x01);
        }
    }

    #[test]
    fn test_serial_control_write() {
        let mut mem = memory(128, 32);
        let mut m = Mmc1::new(Mirroring::Horizontal, false);

        // 0x0E = vertical mirroring, last bank fixed, two CHR banks
        write_serial(&mut m, &mut mem, 0x8000, 0x1E);
        assert_eq!(m.mirroring(), Mirroring::Vertical);
        assert_eq!(m.prg_bank_mode(), PrgBankMode::LastBankFixed);
        assert_eq!(m.chr_bank_mode(), ChrBankMode::TwoBanks);
    }

    #[test]
    fn test_reset_bit_refixes_last_bank() {
        let mut mem = memory(128, 32);
        let mut m = Mmc1::new(Mirroring::Horizontal, false);

        write_serial(&mut m, &mut mem, 0x8000, 0x00); // OneBigBank
        assert_eq!(m.prg_bank_mode(), PrgBankMode::OneBigBank);

        m.cpu_write(&mut mem, 0x8000, 0x80);
        assert_eq!(m.prg_bank_mode(), PrgBankMode::LastBankFixed);
        // The shifter restarted: three stray bits then two more do not
        // complete a register write until the fifth
        m.cpu_write(&mut mem, 0x8000, 0x01);
        assert_eq!(m.prg_bank_mode(), PrgBankMode::LastBankFixed);
    }

    #[test]
    fn test_last_bank_fixed_window() {
        let mut mem = memory(128, 32);
        let mut m = Mmc1::new(Mirroring::Horizontal, false);

        // Select PRG bank 3 for the switchable window
        write_serial(&mut m, &mut mem, 0xE000, 0x03);
        assert_eq!(m.cpu_read(&mem, 0x8000), 3);
        // $C000 stays pinned to the last 16KB bank (bank 7 of 128KB)
        assert_eq!(m.cpu_read(&mem, 0xC000), 7);
    }

    #[test]
    fn test_chr_bank_switching() {
        let mut mem = memory(128, 32);
        let mut m = Mmc1::new(Mirroring::Horizontal, false);

        write_serial(&mut m, &mut mem, 0x8000, 0x10); // two 4KB banks
        write_serial(&mut m, &mut mem, 0xA000, 0x02); // bank 2 at $0000
        write_serial(&mut m, &mut mem, 0xC000, 0x05); // bank 5 at $1000

        assert_eq!(m.ppu_read(&mem, 0x0000), 2);
        assert_eq!(m.ppu_read(&mem, 0x1000), 5);
    }

    #[test]
    fn test_8kb_chr_mode_ignores_low_bit() {
        let mut mem = memory(128, 32);
        let mut m = Mmc1::new(Mirroring::Horizontal, false);

        write_serial(&mut m, &mut mem, 0x8000, 0x00); // one 8KB bank
        write_serial(&mut m, &mut mem, 0xA000, 0x03); // low bit dropped -> bank 2

        assert_eq!(m.ppu_read(&mem, 0x0000), 2);
        assert_eq!(m.ppu_read(&mem, 0x1000), 3);
    }
}
