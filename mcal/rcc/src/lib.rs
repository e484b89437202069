#![cfg_attr(not(any(test, feature = "std")), no_std)]

//! # MCAL RCC
//!
//! Reset and clock control for the STM32F10x: selects the system clock,
//! gates peripheral clocks on the AHB/APB1/APB2 buses, and reports the live
//! system clock frequency through [`ClockSource`] so that timer drivers can
//! convert durations at whatever rate the core is actually running.

use mcal_core::{ClockSource, MError, MResult};

pub mod registers;

pub use registers::{MemoryRegisters, RccRegisters, Register, Stm32f1Registers};

use registers::{cfgr, cr};

/// Internal RC oscillator frequency.
pub const HSI_HZ: u32 = 8_000_000;

/// Highest PLL output the STM32F10x supports.
pub const MAX_SYSCLK_HZ: u32 = 72_000_000;

/// Highest peripheral index in a bus enable register.
pub const MAX_PERIPHERAL_ID: u8 = 31;

/// PLL reference clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PllInput {
    HsiDiv2,
    HseDiv2,
    Hse,
}

/// System clock to switch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SysClock {
    /// External crystal oscillator.
    HseCrystal,
    /// External clock signal with the oscillator bypassed.
    HseBypass,
    /// Internal 8 MHz RC oscillator.
    Hsi,
    /// PLL with the given reference and multiplier (2..=16).
    Pll { input: PllInput, multiplier: u8 },
}

/// Peripheral clock bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bus {
    Ahb,
    Apb1,
    Apb2,
}

impl Bus {
    const fn enable_register(self) -> Register {
        match self {
            Self::Ahb => Register::Ahbenr,
            Self::Apb1 => Register::Apb1enr,
            Self::Apb2 => Register::Apb2enr,
        }
    }
}

/// Board-level clock facts the registers cannot tell us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RccConfig {
    /// Frequency of the external oscillator or clock signal.
    pub hse_hz: u32,
    /// Polls of a ready flag before giving up.
    pub ready_timeout: u32,
}

impl Default for RccConfig {
    fn default() -> Self {
        Self {
            hse_hz: 8_000_000,
            ready_timeout: 0xFFFF,
        }
    }
}

/// RCC driver over a register block.
#[derive(Debug)]
pub struct Rcc<R> {
    regs: R,
    config: RccConfig,
}

impl<R> Rcc<R> {
    pub const fn new(regs: R, config: RccConfig) -> Self {
        Self { regs, config }
    }

    pub fn config(&self) -> &RccConfig {
        &self.config
    }

    /// Releases the register block.
    pub fn free(self) -> R {
        self.regs
    }
}

impl<R: RccRegisters> Rcc<R> {
    /// Switches the system clock, starting the selected oscillator (and the
    /// PLL) first and waiting for each to report ready.
    pub fn init_sys_clock(&mut self, clock: SysClock) -> MResult<()> {
        match clock {
            SysClock::HseCrystal => {
                self.start_hse(false)?;
                self.switch_to(cfgr::SW_HSE)?;
            }
            SysClock::HseBypass => {
                self.start_hse(true)?;
                self.switch_to(cfgr::SW_HSE)?;
            }
            SysClock::Hsi => {
                self.start_hsi()?;
                self.switch_to(cfgr::SW_HSI)?;
            }
            SysClock::Pll { input, multiplier } => {
                self.start_pll(input, multiplier)?;
                self.switch_to(cfgr::SW_PLL)?;
            }
        }

        log::debug!(
            "rcc: system clock {:?} at {} Hz",
            clock,
            self.frequency_hz()
        );
        Ok(())
    }

    /// Enables the clock of peripheral `id` on `bus`.
    pub fn enable_clock(&mut self, bus: Bus, id: u8) -> MResult<()> {
        let mask = peripheral_mask(id)?;
        self.regs.modify(bus.enable_register(), |v| v | mask);
        Ok(())
    }

    /// Disables the clock of peripheral `id` on `bus`.
    pub fn disable_clock(&mut self, bus: Bus, id: u8) -> MResult<()> {
        let mask = peripheral_mask(id)?;
        self.regs.modify(bus.enable_register(), |v| v & !mask);
        Ok(())
    }

    pub fn is_clock_enabled(&self, bus: Bus, id: u8) -> MResult<bool> {
        let mask = peripheral_mask(id)?;
        Ok(self.regs.read(bus.enable_register()) & mask != 0)
    }

    /// Clock currently driving the core, decoded from CFGR.SWS.
    pub fn active_clock(&self) -> Option<SysClock> {
        let cfgr = self.regs.read(Register::Cfgr);
        match (cfgr & cfgr::SWS_MASK) >> cfgr::SWS_SHIFT {
            cfgr::SW_HSI => Some(SysClock::Hsi),
            cfgr::SW_HSE => {
                if self.regs.read(Register::Cr) & cr::HSEBYP != 0 {
                    Some(SysClock::HseBypass)
                } else {
                    Some(SysClock::HseCrystal)
                }
            }
            cfgr::SW_PLL => {
                let input = match (cfgr & cfgr::PLLSRC != 0, cfgr & cfgr::PLLXTPRE != 0) {
                    (false, _) => PllInput::HsiDiv2,
                    (true, true) => PllInput::HseDiv2,
                    (true, false) => PllInput::Hse,
                };
                Some(SysClock::Pll {
                    input,
                    multiplier: decode_pllmul(cfgr),
                })
            }
            _ => None,
        }
    }

    fn start_hsi(&mut self) -> MResult<()> {
        self.regs.modify(Register::Cr, |v| {
            (v & !cr::HSITRIM_MASK) | cr::HSION | cr::HSITRIM_DEFAULT
        });
        self.wait_set(Register::Cr, cr::HSIRDY)
    }

    fn start_hse(&mut self, bypass: bool) -> MResult<()> {
        let cr_now = self.regs.read(Register::Cr);
        let hse_running = cr_now & cr::HSEON != 0;
        let bypassed = cr_now & cr::HSEBYP != 0;

        // HSEBYP is only writable with the oscillator off.
        if hse_running && bypassed != bypass {
            if self.current_switch() == cfgr::SW_HSE || self.pll_uses_hse() {
                return Err(MError::ResourceConflict);
            }
            self.regs.modify(Register::Cr, |v| v & !cr::HSEON);
        }

        self.regs.modify(Register::Cr, |v| {
            if bypass {
                v | cr::HSEBYP
            } else {
                v & !cr::HSEBYP
            }
        });
        self.regs.modify(Register::Cr, |v| v | cr::HSEON);
        self.wait_set(Register::Cr, cr::HSERDY)
    }

    fn start_pll(&mut self, input: PllInput, multiplier: u8) -> MResult<()> {
        if !(2..=16).contains(&multiplier) {
            return Err(MError::InvalidClock);
        }
        let reference_hz = match input {
            PllInput::HsiDiv2 => HSI_HZ / 2,
            PllInput::HseDiv2 => self.config.hse_hz / 2,
            PllInput::Hse => self.config.hse_hz,
        };
        let output_hz = u64::from(reference_hz) * u64::from(multiplier);
        if output_hz > u64::from(MAX_SYSCLK_HZ) {
            return Err(MError::InvalidClock);
        }

        match input {
            PllInput::HsiDiv2 => self.start_hsi()?,
            PllInput::HseDiv2 | PllInput::Hse => {
                if self.regs.read(Register::Cr) & cr::HSERDY == 0 {
                    self.start_hse(false)?;
                }
            }
        }

        // The PLL cannot be reconfigured while it clocks the core.
        if self.current_switch() == cfgr::SW_PLL {
            self.start_hsi()?;
            self.switch_to(cfgr::SW_HSI)?;
        }
        self.regs.modify(Register::Cr, |v| v & !cr::PLLON);

        let source_bits = match input {
            PllInput::HsiDiv2 => 0,
            PllInput::HseDiv2 => cfgr::PLLSRC | cfgr::PLLXTPRE,
            PllInput::Hse => cfgr::PLLSRC,
        };
        let mul_bits = u32::from(multiplier - 2) << cfgr::PLLMUL_SHIFT;
        self.regs.modify(Register::Cfgr, |v| {
            (v & !(cfgr::PLLSRC | cfgr::PLLXTPRE | cfgr::PLLMUL_MASK)) | source_bits | mul_bits
        });

        self.regs.modify(Register::Cr, |v| v | cr::PLLON);
        self.wait_set(Register::Cr, cr::PLLRDY)
    }

    fn switch_to(&mut self, sw: u32) -> MResult<()> {
        self.regs
            .modify(Register::Cfgr, |v| (v & !cfgr::SW_MASK) | sw);

        for _ in 0..self.config.ready_timeout {
            if self.current_switch() == sw {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        log::warn!("rcc: clock switch to {:#04b} timed out", sw);
        Err(MError::Timeout)
    }

    fn wait_set(&self, reg: Register, flag: u32) -> MResult<()> {
        for _ in 0..self.config.ready_timeout {
            if self.regs.read(reg) & flag != 0 {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        log::warn!("rcc: {:?} flag {:#010x} never set", reg, flag);
        Err(MError::Timeout)
    }

    fn current_switch(&self) -> u32 {
        (self.regs.read(Register::Cfgr) & cfgr::SWS_MASK) >> cfgr::SWS_SHIFT
    }

    fn pll_uses_hse(&self) -> bool {
        self.regs.read(Register::Cr) & cr::PLLON != 0
            && self.regs.read(Register::Cfgr) & cfgr::PLLSRC != 0
    }
}

impl<R: RccRegisters> ClockSource for Rcc<R> {
    /// Live system clock frequency; zero if the switch status is reserved.
    fn frequency_hz(&self) -> u32 {
        match self.active_clock() {
            Some(SysClock::Hsi) => HSI_HZ,
            Some(SysClock::HseCrystal | SysClock::HseBypass) => self.config.hse_hz,
            Some(SysClock::Pll { input, multiplier }) => {
                let reference_hz = match input {
                    PllInput::HsiDiv2 => HSI_HZ / 2,
                    PllInput::HseDiv2 => self.config.hse_hz / 2,
                    PllInput::Hse => self.config.hse_hz,
                };
                reference_hz.saturating_mul(u32::from(multiplier))
            }
            None => 0,
        }
    }
}

fn peripheral_mask(id: u8) -> MResult<u32> {
    if id > MAX_PERIPHERAL_ID {
        return Err(MError::InvalidPeripheral);
    }
    Ok(1 << id)
}

/// PLLMUL field: 0b0000 is ×2, each step adds one, 0b1111 is ×16 again.
fn decode_pllmul(cfgr: u32) -> u8 {
    let field = ((cfgr & cfgr::PLLMUL_MASK) >> cfgr::PLLMUL_SHIFT) as u8;
    (field + 2).min(16)
}
