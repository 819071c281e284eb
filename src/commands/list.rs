//! List commands implementation

use crate::backends;
use spilink_core::{BusDescriptor, SpiBusProvider};

/// List all compiled-in backends
pub fn list_backends() {
    let backends = backends::available_backends();

    if backends.is_empty() {
        println!("No backends available (recompile with backend features enabled)");
        return;
    }

    println!("Available backends:");
    println!();
    for b in &backends {
        if b.aliases.is_empty() {
            println!("  {:10} - {}", b.name, b.description);
        } else {
            println!(
                "  {:10} - {} (aliases: {})",
                b.name,
                b.description,
                b.aliases.join(", ")
            );
        }
    }
}

/// List buses known to `provider`, optionally filtered by name
pub fn list_buses<P: SpiBusProvider>(
    provider: &P,
    name: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let buses = match name {
        Some(name) => provider.find_buses(name)?,
        None => provider.list_buses()?,
    };

    if buses.is_empty() {
        println!("No buses found");
        return Ok(());
    }

    print!("{}", format_bus_table(&buses));
    Ok(())
}

fn format_bus_table(buses: &[BusDescriptor]) -> String {
    let mut out = String::from("Name         Id\n");
    out.push_str(&"-".repeat(24));
    out.push('\n');
    for bus in buses {
        out.push_str(&format!("{:<12} {}\n", bus.name, bus.id));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_table() {
        let table = format_bus_table(&[
            BusDescriptor::new("SPI0", "0"),
            BusDescriptor::new("SPI12", "12"),
        ]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "Name         Id");
        assert_eq!(lines[2], "SPI0         0");
        assert_eq!(lines[3], "SPI12        12");
        assert_eq!(lines.len(), 4);
    }
}
