// Serial protocol for the motor-carrier board.
//
// The carrier exposes the H-bridge PWM channels and direction GPIOs over a
// small framed protocol:
// Request:  [0xFF, 0xFF, Instruction, Length, Params..., Checksum]
// Response: [0xFF, 0xFF, Status, Checksum]
// Checksum is the complement of the byte sum, header excluded.

use std::io::{Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use tracing::debug;

use super::pwm::{PwmError, PwmOutput};

/// Default serial configuration for the carrier board
pub const DEFAULT_BAUDRATE: u32 = 115_200;
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

/// Packet header bytes
const HEADER: [u8; 2] = [0xFF, 0xFF];

/// Instruction set
#[repr(u8)]
#[derive(Debug, Clone, Copy)]
pub enum Instruction {
    Ping = 0x01,
    SetDuty = 0x02,
    SetDirection = 0x03,
    SetFrequency = 0x04,
}

pub type Result<T> = std::result::Result<T, PwmError>;

/// Connection to the motor-carrier board.
pub struct DriveBoard {
    port: Box<dyn SerialPort>,
}

impl DriveBoard {
    /// Open a new connection to the carrier board
    pub fn open(port_name: &str) -> Result<Self> {
        Self::open_with_baudrate(port_name, DEFAULT_BAUDRATE)
    }

    /// Open with custom baudrate
    pub fn open_with_baudrate(port_name: &str, baudrate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baudrate)
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .open()?;

        Ok(Self { port })
    }

    /// Calculate checksum for a packet (excluding header)
    fn checksum(data: &[u8]) -> u8 {
        let sum: u16 = data.iter().map(|&b| b as u16).sum();
        (!sum & 0xFF) as u8
    }

    /// Build a packet with header and checksum
    fn build_packet(instruction: Instruction, params: &[u8]) -> Vec<u8> {
        let length = (params.len() + 1) as u8; // params + checksum
        let mut packet = Vec::with_capacity(5 + params.len());

        packet.extend_from_slice(&HEADER);
        packet.push(instruction as u8);
        packet.push(length);
        packet.extend_from_slice(params);

        // Checksum over instruction, length, params
        let checksum_data = &packet[2..];
        packet.push(Self::checksum(checksum_data));

        packet
    }

    fn send_packet(&mut self, packet: &[u8]) -> Result<()> {
        self.port.write_all(packet)?;
        self.port.flush()?;
        Ok(())
    }

    /// Read and validate the status response
    fn read_response(&mut self) -> Result<()> {
        let mut header = [0u8; 2];
        self.port.read_exact(&mut header).map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                PwmError::Timeout
            } else {
                PwmError::Io(e)
            }
        })?;

        if header != HEADER {
            return Err(PwmError::InvalidResponse {
                reason: format!("invalid header: {:02X?}", header),
            });
        }

        let mut rest = [0u8; 2];
        self.port.read_exact(&mut rest)?;
        let status = rest[0];

        if Self::checksum(&[status]) != rest[1] {
            return Err(PwmError::ChecksumMismatch);
        }

        if status != 0 {
            return Err(PwmError::Rejected { status });
        }

        Ok(())
    }

    fn transact(&mut self, instruction: Instruction, params: &[u8]) -> Result<()> {
        let packet = Self::build_packet(instruction, params);
        self.send_packet(&packet)?;
        self.read_response()
    }

    /// Check whether the board is alive
    pub fn ping(&mut self) -> Result<bool> {
        let packet = Self::build_packet(Instruction::Ping, &[]);
        self.send_packet(&packet)?;

        match self.read_response() {
            Ok(()) => Ok(true),
            Err(PwmError::Timeout) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Configure the PWM carrier frequency of a channel
    pub fn set_frequency(&mut self, channel: u8, frequency_hz: u32) -> Result<()> {
        let hz = frequency_hz.to_le_bytes();
        let params = [channel, hz[0], hz[1], hz[2], hz[3]];
        debug!("board: channel {} frequency {} Hz", channel, frequency_hz);
        self.transact(Instruction::SetFrequency, &params)
    }
}

/// Encode a duty percentage as centi-percent (0-10000)
fn encode_duty(duty_percent: f32) -> u16 {
    (duty_percent.clamp(0.0, 100.0) * 100.0).round() as u16
}

impl PwmOutput for DriveBoard {
    fn write_pwm(&mut self, channel: u8, duty_percent: f32) -> Result<()> {
        let duty = encode_duty(duty_percent).to_le_bytes();
        let params = [channel, duty[0], duty[1]];
        debug!("board: pwm channel {} <- {:.2}%", channel, duty_percent);
        self.transact(Instruction::SetDuty, &params)
    }

    fn write_direction(&mut self, gpio: u8, level: bool) -> Result<()> {
        let params = [gpio, level as u8];
        debug!("board: dir gpio {} <- {}", gpio, level);
        self.transact(Instruction::SetDirection, &params)
    }
}
