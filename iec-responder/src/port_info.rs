//! Serial port listing for `--list-ports`

use serialport::{available_ports, SerialPortType};
use tracing::info;

/// A serial port found on this machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSummary {
    /// Port name (e.g., /dev/ttyUSB0, COM3)
    pub port: String,
    /// Short description of the port type
    pub description: String,
}

impl PortSummary {
    fn from_serialport(port: String, port_type: &SerialPortType) -> Self {
        let description = match port_type {
            SerialPortType::UsbPort(usb) => {
                let product = usb.product.as_deref().unwrap_or("USB serial");
                format!("{} [{:04X}:{:04X}]", product, usb.vid, usb.pid)
            }
            SerialPortType::PciPort => "PCI".to_string(),
            SerialPortType::BluetoothPort => "Bluetooth".to_string(),
            SerialPortType::Unknown => "unknown".to_string(),
        };
        Self { port, description }
    }
}

/// Enumerate serial ports
pub fn list_ports() -> Result<Vec<PortSummary>, serialport::Error> {
    let ports: Vec<_> = available_ports()?
        .into_iter()
        .map(|p| PortSummary::from_serialport(p.port_name, &p.port_type))
        .collect();
    info!("Found {} serial port(s)", ports.len());
    Ok(ports)
}
