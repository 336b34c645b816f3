//! INDI client adapter.
//!
//! Implements [`DevicePort`] over a plain TCP connection to an INDI server
//! (`indiserver`, port 7624 by default).  Writes are sent as
//! `new*Vector` messages; state and number values come from the
//! `def*Vector` / `set*Vector` stream, cached per device and property.
//!
//! After a number write the cached state is marked `Busy` until the
//! driver reports otherwise, so a poll issued before the server has
//! answered cannot see a stale `Ok`.

pub mod xml;

use std::collections::HashMap;
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::app::ports::{DevicePort, PropertyState};
use crate::error::DeviceError;

use self::xml::{Element, Scanner, escape};

/// Read timeout for one socket read; bounds how long a drain blocks.
const READ_SLICE: Duration = Duration::from_millis(50);

/// Longest a single drain keeps reading a busy stream.
const DRAIN_BUDGET: Duration = Duration::from_millis(500);

const PROTOCOL_VERSION: &str = "1.7";

#[derive(Debug, Clone, Default)]
struct CachedProperty {
    state: Option<PropertyState>,
    numbers: HashMap<String, f64>,
}

/// Blocking INDI client.
pub struct IndiClient {
    stream: TcpStream,
    scanner: Scanner,
    properties: HashMap<String, HashMap<String, CachedProperty>>,
    timeout: Duration,
}

impl IndiClient {
    /// Connect, request every property and read the initial definitions.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, DeviceError> {
        let addr = (host, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| DeviceError::Io(format!("{host}:{port} did not resolve")))?;
        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        stream.set_read_timeout(Some(READ_SLICE))?;
        stream.set_write_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;
        info!("Connected to INDI server at {addr}");

        let mut client = Self {
            stream,
            scanner: Scanner::new(),
            properties: HashMap::new(),
            timeout,
        };
        client.send(&format!("<getProperties version=\"{PROTOCOL_VERSION}\"/>\n"))?;
        client.drain()?;
        Ok(client)
    }

    fn send(&mut self, message: &str) -> Result<(), DeviceError> {
        debug!("INDI >> {}", message.trim_end());
        self.stream.write_all(message.as_bytes())?;
        Ok(())
    }

    /// Read whatever the server has sent and fold it into the cache.
    fn drain(&mut self) -> Result<(), DeviceError> {
        let started = Instant::now();
        let mut chunk = [0u8; 8192];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => return Err(DeviceError::Disconnected),
                Ok(n) => {
                    self.scanner.feed(&chunk[..n]);
                    self.apply_pending();
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
            if started.elapsed() >= DRAIN_BUDGET {
                return Ok(());
            }
        }
    }

    fn apply_pending(&mut self) {
        while let Some(next) = self.scanner.next_element() {
            match next {
                Ok(element) => self.apply(&element),
                Err(e) => warn!("Skipping INDI input: {e}"),
            }
        }
    }

    fn apply(&mut self, element: &Element) {
        let device = element.attr("device").unwrap_or_default();
        match element.name.as_str() {
            "message" => {
                if let Some(text) = element.attr("message") {
                    info!("INDI {device}: {text}");
                }
            }
            "delProperty" => match element.attr("name") {
                Some(name) => {
                    if let Some(props) = self.properties.get_mut(device) {
                        props.remove(name);
                    }
                }
                None => {
                    self.properties.remove(device);
                }
            },
            tag if is_vector(tag) => {
                let Some(name) = element.attr("name") else {
                    return;
                };
                let cached = self
                    .properties
                    .entry(device.to_owned())
                    .or_default()
                    .entry(name.to_owned())
                    .or_default();
                if let Some(state) = element.attr("state").and_then(PropertyState::parse) {
                    cached.state = Some(state);
                }
                for child in &element.children {
                    let (Some(key), Some(value)) = (child.attr("name"), parse_number(&child.text))
                    else {
                        continue;
                    };
                    cached.numbers.insert(key.to_owned(), value);
                }
            }
            _ => {}
        }
    }

    fn is_cached(&self, device: &str, property: &str) -> bool {
        self.properties
            .get(device)
            .is_some_and(|props| props.contains_key(property))
    }

    /// Refresh the cache, asking the server for `device/property` if it has
    /// not been defined yet.
    fn lookup(&mut self, device: &str, property: &str) -> Result<&CachedProperty, DeviceError> {
        self.drain()?;
        if !self.is_cached(device, property) {
            self.send(&format!(
                "<getProperties version=\"{PROTOCOL_VERSION}\" device=\"{}\" name=\"{}\"/>\n",
                escape(device),
                escape(property)
            ))?;
            let started = Instant::now();
            while !self.is_cached(device, property) && started.elapsed() < self.timeout {
                self.drain()?;
            }
        }
        self.properties
            .get(device)
            .and_then(|props| props.get(property))
            .ok_or_else(|| DeviceError::UnknownProperty {
                device: device.to_owned(),
                property: property.to_owned(),
            })
    }

    fn mark_busy(&mut self, device: &str, property: &str) {
        self.properties
            .entry(device.to_owned())
            .or_default()
            .entry(property.to_owned())
            .or_default()
            .state = Some(PropertyState::Busy);
    }
}

impl DevicePort for IndiClient {
    fn set_switch(
        &mut self,
        device: &str,
        property: &str,
        element: &str,
        on: bool,
    ) -> Result<(), DeviceError> {
        let value = if on { "On" } else { "Off" };
        self.send(&new_vector(
            "Switch",
            device,
            property,
            &[(element, value.to_owned())],
        ))
    }

    fn set_number(
        &mut self,
        device: &str,
        property: &str,
        values: &[(&str, f64)],
    ) -> Result<(), DeviceError> {
        if let Some((name, _)) = values.iter().find(|(_, v)| !v.is_finite()) {
            return Err(DeviceError::BadValue(format!("{property}.{name} is not finite")));
        }
        let elements: Vec<(&str, String)> = values
            .iter()
            .map(|(name, value)| (*name, value.to_string()))
            .collect();
        self.send(&new_vector("Number", device, property, &elements))?;
        self.mark_busy(device, property);
        Ok(())
    }

    fn set_text(
        &mut self,
        device: &str,
        property: &str,
        element: &str,
        value: &str,
    ) -> Result<(), DeviceError> {
        self.send(&new_vector(
            "Text",
            device,
            property,
            &[(element, value.to_owned())],
        ))
    }

    fn property_state(
        &mut self,
        device: &str,
        property: &str,
    ) -> Result<PropertyState, DeviceError> {
        Ok(self
            .lookup(device, property)?
            .state
            .unwrap_or(PropertyState::Idle))
    }

    fn number(&mut self, device: &str, property: &str, element: &str) -> Result<f64, DeviceError> {
        self.lookup(device, property)?
            .numbers
            .get(element)
            .copied()
            .ok_or_else(|| DeviceError::UnknownProperty {
                device: device.to_owned(),
                property: format!("{property}.{element}"),
            })
    }
}

fn is_vector(tag: &str) -> bool {
    (tag.starts_with("def") || tag.starts_with("set")) && tag.ends_with("Vector")
}

/// `new{kind}Vector` message with one `one{kind}` per element.
fn new_vector(kind: &str, device: &str, property: &str, elements: &[(&str, String)]) -> String {
    let mut out = format!(
        "<new{kind}Vector device=\"{}\" name=\"{}\">\n",
        escape(device),
        escape(property)
    );
    for (name, value) in elements {
        out.push_str(&format!(
            "  <one{kind} name=\"{}\">{}</one{kind}>\n",
            escape(name),
            escape(value)
        ));
    }
    out.push_str(&format!("</new{kind}Vector>\n"));
    out
}

/// INDI numbers are decimal or sexagesimal (`-12:30:15.5`).
fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if let Ok(value) = text.parse::<f64>() {
        return Some(value);
    }
    let negative = text.starts_with('-');
    let mut total = 0.0;
    let mut scale = 1.0;
    for part in text.trim_start_matches(['-', '+']).split([':', ' ']) {
        if part.is_empty() {
            continue;
        }
        total += part.parse::<f64>().ok()? / scale;
        scale *= 60.0;
    }
    if scale == 1.0 {
        return None;
    }
    Some(if negative { -total } else { total })
}
