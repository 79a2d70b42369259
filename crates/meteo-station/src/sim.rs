//! Simulated sensor bus for running the station without hardware.
//!
//! Every sensor is emulated at the register level, so the real drivers for
//! the HDC1000, DPS310, VEML6070 and the detected light sensor family run
//! unchanged on the host. The simulated weather follows slow sine waves.

use std::f64::consts::TAU;
use std::time::Instant;

use embedded_hal_async::i2c::{self, ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use log::trace;
use meteo_core::sensors::light::LIGHT_SENSOR_ADDRESS;
use meteo_core::sensors::{dps310, hdc1000, veml6070};

/// Which part answers at the light sensor address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightChip {
    Tsl45315,
    Ltr329,
    /// Every transfer to the light sensor address is NACKed.
    Absent,
}

/// Value oscillating around `base` with a fixed period.
#[derive(Debug, Clone, Copy)]
pub struct Waveform {
    started: Instant,
    base: f64,
    swing: f64,
    period_secs: f64,
}

impl Waveform {
    pub fn new(base: f64, swing: f64, period_secs: f64) -> Self {
        Self {
            started: Instant::now(),
            base,
            swing,
            period_secs,
        }
    }

    pub fn sample(&self) -> f64 {
        let t = self.started.elapsed().as_secs_f64();
        self.base + self.swing * (TAU * t / self.period_secs).sin()
    }
}

/// Conditions the simulated sensors measure.
#[derive(Debug, Clone, Copy)]
pub struct Weather {
    pub temperature_celsius: Waveform,
    pub humidity_percent: Waveform,
    pub pressure_hpa: Waveform,
    pub lux: Waveform,
    pub uv_microwatts_per_cm2: Waveform,
}

impl Weather {
    /// Cycles with periods between ten minutes and an hour.
    pub fn daylight() -> Self {
        Self {
            temperature_celsius: Waveform::new(21.0, 4.0, 900.0),
            humidity_percent: Waveform::new(50.0, 12.0, 1_300.0),
            pressure_hpa: Waveform::new(1008.0, 6.0, 3_600.0),
            lux: Waveform::new(500.0, 400.0, 600.0),
            uv_microwatts_per_cm2: Waveform::new(675.0, 620.0, 600.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimBusError(ErrorKind);

impl i2c::Error for SimBusError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

const NACK: SimBusError = SimBusError(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));

// Register addresses as the drivers put them on the wire
const TSL_CONTROL: u8 = 0x80;
const TSL_DATA_LOW: u8 = 0x84;
const TSL_ID: u8 = 0x8A;
const TSL_POWER_ON: u8 = 0x03;
const TSL_ID_VALUE: u8 = 0xA4;

const LTR_ALS_CONTR: u8 = 0x80;
const LTR_PART_ID: u8 = 0x86;
const LTR_MANUFAC_ID: u8 = 0x87;
const LTR_DATA_CH1_0: u8 = 0x88;
const LTR_ACTIVE: u8 = 0x01;
const LTR_PART_ID_VALUE: u8 = 0xA0;

/// Lux per CH0 count at 1x gain and 100 ms with CH1 at a quarter of CH0.
const LTR_LUX_PER_CH0: f64 = 1.7743 + 1.1059 / 4.0;

const HDC_TEMPERATURE: u8 = 0x00;
const HDC_MANUFACTURER_ID: u8 = 0xFE;
const HDC_DEVICE_ID: u8 = 0xFF;

const DPS_PSR_B2: u8 = 0x00;
const DPS_MEAS_CFG: u8 = 0x08;
const DPS_PRODUCT_ID: u8 = 0x0D;
const DPS_COEF: u8 = 0x10;
/// Coefficient and sensor ready.
const DPS_READY: u8 = 0xC0;
/// Temperature and pressure results ready.
const DPS_RESULTS_READY: u8 = 0x30;
const DPS_CONTINUOUS_BOTH: u8 = 0x07;
/// c0 = 0, c1 = 1000, c00 = c10 = 100000, all higher terms zero. Temperature
/// is then `1000 t` and pressure `100000 (1 + p)` Pa.
const DPS_COEF_BYTES: [u8; 8] = [0x00, 0x03, 0xE8, 0x18, 0x6A, 0x01, 0x86, 0xA0];
const DPS_SCALE_64X: f64 = 1_040_384.0;

const VEML_COMMAND_LSB: u8 = 0x38;
const VEML_MSB: u8 = 0x39;
const VEML_ALERT_RESPONSE: u8 = 0x0C;
const VEML_SHUTDOWN: u8 = 0x01;

/// 256 byte registers behind an auto-incrementing pointer.
///
/// A write sets the pointer from its first byte and stores the rest at
/// consecutive registers. Reads start at the pointer.
struct RegisterFile {
    registers: [u8; 256],
    pointer: u8,
}

impl RegisterFile {
    fn new() -> Self {
        Self {
            registers: [0; 256],
            pointer: 0,
        }
    }

    fn get(&self, reg: u8) -> u8 {
        self.registers[usize::from(reg)]
    }

    fn store(&mut self, start: u8, bytes: &[u8]) {
        for (offset, byte) in bytes.iter().enumerate() {
            self.registers[usize::from(start.wrapping_add(offset as u8))] = *byte;
        }
    }

    /// Returns the register the write started at.
    fn write(&mut self, bytes: &[u8]) -> Option<u8> {
        let (&reg, values) = bytes.split_first()?;
        self.pointer = reg;
        self.store(reg, values);
        Some(reg)
    }

    fn read(&self, buffer: &mut [u8]) {
        for (offset, byte) in buffer.iter_mut().enumerate() {
            *byte = self.get(self.pointer.wrapping_add(offset as u8));
        }
    }
}

fn clamp_u16(value: f64) -> u16 {
    value.round().clamp(0.0, f64::from(u16::MAX)) as u16
}

/// 24-bit two's complement, most significant byte first.
fn be24(value: i32) -> [u8; 3] {
    let [_, high, mid, low] = value.to_be_bytes();
    [high, mid, low]
}

/// One I2C bus carrying the station's sensors.
///
/// | Address           | Part                    |
/// |-------------------|-------------------------|
/// | 0x29              | light sensor, by `chip` |
/// | 0x40              | HDC1000                 |
/// | 0x76              | DPS310                  |
/// | 0x38, 0x39, 0x0C  | VEML6070                |
///
/// Anything else is NACKed.
pub struct SimulatedBus {
    chip: LightChip,
    weather: Weather,
    light: RegisterFile,
    climate_pointer: u8,
    climate_result: [u8; 4],
    barometer: RegisterFile,
    uv_command: u8,
    uv_counts: u16,
}

impl SimulatedBus {
    pub fn new(chip: LightChip, weather: Weather) -> Self {
        let mut light = RegisterFile::new();
        match chip {
            LightChip::Tsl45315 => light.store(TSL_ID, &[TSL_ID_VALUE]),
            LightChip::Ltr329 => light.store(LTR_PART_ID, &[LTR_PART_ID_VALUE, 0x05]),
            LightChip::Absent => {}
        }

        let mut barometer = RegisterFile::new();
        barometer.store(DPS_PRODUCT_ID, &[0x10]);
        barometer.store(DPS_MEAS_CFG, &[DPS_READY]);
        barometer.store(DPS_COEF, &DPS_COEF_BYTES);

        Self {
            chip,
            weather,
            light,
            climate_pointer: 0,
            climate_result: [0; 4],
            barometer,
            uv_command: VEML_SHUTDOWN,
            uv_counts: 0,
        }
    }

    pub fn daylight(chip: LightChip) -> Self {
        Self::new(chip, Weather::daylight())
    }

    /// Latch a fresh light conversion into the data registers.
    fn refresh_light(&mut self) {
        let lux = self.weather.lux.sample().max(0.0);
        match self.chip {
            LightChip::Tsl45315 => {
                let powered = self.light.get(TSL_CONTROL) & TSL_POWER_ON == TSL_POWER_ON;
                let counts = if powered { clamp_u16(lux / 4.0) } else { 0 };
                self.light.store(TSL_DATA_LOW, &counts.to_le_bytes());
            }
            LightChip::Ltr329 => {
                let active = self.light.get(LTR_ALS_CONTR) & LTR_ACTIVE != 0;
                let (ch0, ch1) = if active {
                    let ch0 = clamp_u16(lux / LTR_LUX_PER_CH0).min(65_534);
                    (ch0, ch0 / 4)
                } else {
                    (0, 0)
                };
                let [ch1_low, ch1_high] = ch1.to_le_bytes();
                let [ch0_low, ch0_high] = ch0.to_le_bytes();
                self.light
                    .store(LTR_DATA_CH1_0, &[ch1_low, ch1_high, ch0_low, ch0_high]);
            }
            LightChip::Absent => {}
        }
    }

    /// Temperature and humidity conversion, started by pointing at register 0.
    fn convert_climate(&mut self) {
        let temperature = self.weather.temperature_celsius.sample();
        let humidity = self.weather.humidity_percent.sample().clamp(0.0, 99.99);
        let [t_high, t_low] = clamp_u16((temperature + 40.0) / 165.0 * 65_536.0).to_be_bytes();
        let [h_high, h_low] = clamp_u16(humidity / 100.0 * 65_536.0).to_be_bytes();
        self.climate_result = [t_high, t_low, h_high, h_low];
    }

    fn climate_register(&self) -> [u8; 4] {
        match self.climate_pointer {
            HDC_TEMPERATURE => self.climate_result,
            HDC_MANUFACTURER_ID => [0x54, 0x49, 0, 0],
            HDC_DEVICE_ID => [0x10, 0x00, 0, 0],
            _ => [0; 4],
        }
    }

    fn refresh_barometer(&mut self) {
        let pascal = self.weather.pressure_hpa.sample() * 100.0;
        let temperature = self.weather.temperature_celsius.sample();
        let raw_pressure = ((pascal - 100_000.0) / 100_000.0 * DPS_SCALE_64X).round() as i32;
        let raw_temperature = (temperature / 1000.0 * DPS_SCALE_64X).round() as i32;

        let mut results = [0u8; 6];
        results[..3].copy_from_slice(&be24(raw_pressure));
        results[3..].copy_from_slice(&be24(raw_temperature));
        self.barometer.store(DPS_PSR_B2, &results);
    }

    fn write_barometer(&mut self, bytes: &[u8]) {
        if let Some(DPS_MEAS_CFG) = self.barometer.write(bytes) {
            let mode = self.barometer.get(DPS_MEAS_CFG) & DPS_CONTINUOUS_BOTH;
            let status = if mode == DPS_CONTINUOUS_BOTH {
                DPS_READY | DPS_RESULTS_READY | mode
            } else {
                DPS_READY | mode
            };
            self.barometer.store(DPS_MEAS_CFG, &[status]);
        }
    }

    /// Latched when the high byte is read, the driver reads it first.
    fn latch_uv(&mut self) {
        self.uv_counts = if self.uv_command & VEML_SHUTDOWN == 0 {
            clamp_u16(
                self.weather.uv_microwatts_per_cm2.sample() / f64::from(veml6070::MICROWATTS_PER_COUNT),
            )
        } else {
            0
        };
    }

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), SimBusError> {
        match address {
            LIGHT_SENSOR_ADDRESS => {
                if let Some(reg) = self.light.write(bytes) {
                    trace!("sim {:?}: write {:#04x} <- {:02x?}", self.chip, reg, &bytes[1..]);
                }
            }
            hdc1000::DEFAULT_ADDRESS => {
                if let Some(&reg) = bytes.first() {
                    self.climate_pointer = reg;
                    if reg == HDC_TEMPERATURE {
                        self.convert_climate();
                    }
                }
            }
            dps310::ALTERNATE_ADDRESS => self.write_barometer(bytes),
            VEML_COMMAND_LSB => {
                if let Some(&command) = bytes.last() {
                    self.uv_command = command;
                }
            }
            _ => return Err(NACK),
        }
        Ok(())
    }

    fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), SimBusError> {
        match address {
            LIGHT_SENSOR_ADDRESS => {
                self.refresh_light();
                self.light.read(buffer);
            }
            hdc1000::DEFAULT_ADDRESS => {
                let register = self.climate_register();
                for (byte, value) in buffer.iter_mut().zip(register) {
                    *byte = value;
                }
            }
            dps310::ALTERNATE_ADDRESS => {
                if self.barometer.pointer == DPS_PSR_B2 {
                    self.refresh_barometer();
                }
                self.barometer.read(buffer);
            }
            VEML_MSB => {
                self.latch_uv();
                buffer.fill(self.uv_counts.to_be_bytes()[0]);
            }
            VEML_COMMAND_LSB => buffer.fill(self.uv_counts.to_be_bytes()[1]),
            VEML_ALERT_RESPONSE => buffer.fill(0),
            _ => return Err(NACK),
        }
        Ok(())
    }
}

impl ErrorType for SimulatedBus {
    type Error = SimBusError;
}

impl I2c for SimulatedBus {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address == LIGHT_SENSOR_ADDRESS && self.chip == LightChip::Absent {
            return Err(NACK);
        }

        for operation in operations {
            match operation {
                Operation::Write(bytes) => self.write(address, bytes)?,
                Operation::Read(buffer) => self.read(address, buffer)?,
            }
        }
        Ok(())
    }
}
