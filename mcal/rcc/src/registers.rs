//! RCC register map and register-block implementations.

/// RCC registers used by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    Cr,
    Cfgr,
    Ahbenr,
    Apb2enr,
    Apb1enr,
}

impl Register {
    /// Byte offset from the RCC base address.
    pub const fn offset(self) -> usize {
        match self {
            Self::Cr => 0x00,
            Self::Cfgr => 0x04,
            Self::Ahbenr => 0x14,
            Self::Apb2enr => 0x18,
            Self::Apb1enr => 0x1C,
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Cr => 0,
            Self::Cfgr => 1,
            Self::Ahbenr => 2,
            Self::Apb2enr => 3,
            Self::Apb1enr => 4,
        }
    }
}

/// CR bit positions
pub mod cr {
    pub const HSION: u32 = 1 << 0;
    pub const HSIRDY: u32 = 1 << 1;
    pub const HSITRIM_SHIFT: u32 = 3;
    pub const HSITRIM_MASK: u32 = 0x1F << HSITRIM_SHIFT;
    /// Factory default trim, centre of the range.
    pub const HSITRIM_DEFAULT: u32 = 0x10 << HSITRIM_SHIFT;
    pub const HSEON: u32 = 1 << 16;
    pub const HSERDY: u32 = 1 << 17;
    pub const HSEBYP: u32 = 1 << 18;
    pub const PLLON: u32 = 1 << 24;
    pub const PLLRDY: u32 = 1 << 25;
}

/// CFGR bit positions
pub mod cfgr {
    pub const SW_MASK: u32 = 0b11;
    pub const SW_HSI: u32 = 0b00;
    pub const SW_HSE: u32 = 0b01;
    pub const SW_PLL: u32 = 0b10;
    pub const SWS_SHIFT: u32 = 2;
    pub const SWS_MASK: u32 = 0b11 << SWS_SHIFT;
    pub const PLLSRC: u32 = 1 << 16;
    pub const PLLXTPRE: u32 = 1 << 17;
    pub const PLLMUL_SHIFT: u32 = 18;
    pub const PLLMUL_MASK: u32 = 0b1111 << PLLMUL_SHIFT;
}

/// Access to the RCC register block.
pub trait RccRegisters {
    fn read(&self, reg: Register) -> u32;

    fn write(&mut self, reg: Register, value: u32);

    fn modify<F>(&mut self, reg: Register, f: F)
    where
        F: FnOnce(u32) -> u32,
    {
        let value = self.read(reg);
        self.write(reg, f(value));
    }
}

/// Memory-backed register block that mimics the oscillator handshakes.
///
/// Ready flags follow their enable bits on every CR write, and CFGR.SWS
/// follows CFGR.SW. Individual oscillators can be marked dead so that their
/// ready flag never rises.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRegisters {
    regs: [u32; 5],
    dead_hse: bool,
    dead_pll: bool,
}

impl Default for MemoryRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRegisters {
    /// Reset state: HSI on and selected, SRAM and FLITF clocks enabled.
    pub const fn new() -> Self {
        Self {
            regs: [cr::HSION | cr::HSIRDY | cr::HSITRIM_DEFAULT, 0, 0x0000_0014, 0, 0],
            dead_hse: false,
            dead_pll: false,
        }
    }

    /// The external oscillator never starts.
    pub fn with_dead_hse(mut self) -> Self {
        self.dead_hse = true;
        self
    }

    /// The PLL never locks.
    pub fn with_dead_pll(mut self) -> Self {
        self.dead_pll = true;
        self
    }
}

impl RccRegisters for MemoryRegisters {
    fn read(&self, reg: Register) -> u32 {
        self.regs[reg.index()]
    }

    fn write(&mut self, reg: Register, value: u32) {
        let value = match reg {
            Register::Cr => {
                let mut value = value & !(cr::HSIRDY | cr::HSERDY | cr::PLLRDY);
                if value & cr::HSION != 0 {
                    value |= cr::HSIRDY;
                }
                if value & cr::HSEON != 0 && !self.dead_hse {
                    value |= cr::HSERDY;
                }
                if value & cr::PLLON != 0 && !self.dead_pll {
                    value |= cr::PLLRDY;
                }
                value
            }
            Register::Cfgr => {
                let sw = value & cfgr::SW_MASK;
                (value & !cfgr::SWS_MASK) | (sw << cfgr::SWS_SHIFT)
            }
            _ => value,
        };
        self.regs[reg.index()] = value;
    }
}

/// Memory-mapped RCC of an STM32F10x.
#[derive(Debug)]
pub struct Stm32f1Registers {
    _private: (),
}

impl Stm32f1Registers {
    /// RCC base address on the AHB bus.
    pub const BASE: usize = 0x4002_1000;

    /// # Safety
    ///
    /// The caller must be running on an STM32F10x and must be the only owner
    /// of the RCC register block.
    pub const unsafe fn steal() -> Self {
        Self { _private: () }
    }

    fn ptr(reg: Register) -> *mut u32 {
        (Self::BASE + reg.offset()) as *mut u32
    }
}

impl RccRegisters for Stm32f1Registers {
    fn read(&self, reg: Register) -> u32 {
        // SAFETY: aligned, always-mapped peripheral register; ownership is
        // guaranteed by the `steal` contract.
        unsafe { core::ptr::read_volatile(Self::ptr(reg)) }
    }

    fn write(&mut self, reg: Register, value: u32) {
        // SAFETY: as for `read`.
        unsafe { core::ptr::write_volatile(Self::ptr(reg), value) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_match_reference_manual() {
        assert_eq!(Register::Cr.offset(), 0x00);
        assert_eq!(Register::Cfgr.offset(), 0x04);
        assert_eq!(Register::Ahbenr.offset(), 0x14);
        assert_eq!(Register::Apb2enr.offset(), 0x18);
        assert_eq!(Register::Apb1enr.offset(), 0x1C);
    }

    #[test]
    fn memory_block_models_handshakes() {
        let mut regs = MemoryRegisters::new();
        regs.modify(Register::Cr, |v| v | cr::HSEON);
        assert_ne!(regs.read(Register::Cr) & cr::HSERDY, 0);

        regs.modify(Register::Cfgr, |v| (v & !cfgr::SW_MASK) | cfgr::SW_HSE);
        assert_eq!(
            regs.read(Register::Cfgr) & cfgr::SWS_MASK,
            cfgr::SW_HSE << cfgr::SWS_SHIFT
        );
    }

    #[test]
    fn dead_oscillator_never_ready() {
        let mut regs = MemoryRegisters::new().with_dead_hse();
        regs.modify(Register::Cr, |v| v | cr::HSEON);
        assert_eq!(regs.read(Register::Cr) & cr::HSERDY, 0);
    }
}
