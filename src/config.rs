/*
    Copyright (C) 2025 fieryhenry

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU General Public License as published by
    the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU General Public License for more details.

    You should have received a copy of the GNU General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use std::{
    cmp::Ordering,
    fmt::Display,
    hash::{Hash, Hasher},
    io::{Read, Seek, Write},
};

use crate::stream::{
    read_bytes, write_bytes, NewResultCtx, Readable, ReadableNoOptions, StreamError,
    StreamResult, Writeable, WriteableNoOptions,
};

const MCC: usize = 0;
const MNC: usize = 2;
const LANGUAGE: usize = 4;
const COUNTRY: usize = 6;
const ORIENTATION: usize = 8;
const TOUCHSCREEN: usize = 9;
const DENSITY: usize = 10;
const KEYBOARD: usize = 12;
const NAVIGATION: usize = 13;
const INPUT_FLAGS: usize = 14;
const SCREEN_WIDTH: usize = 16;
const SCREEN_HEIGHT: usize = 18;
const SDK_VERSION: usize = 20;
const SCREEN_LAYOUT: usize = 24;
const UI_MODE: usize = 25;
const SMALLEST_SCREEN_WIDTH_DP: usize = 26;
const SCREEN_WIDTH_DP: usize = 28;
const SCREEN_HEIGHT_DP: usize = 30;
const SCREEN_LAYOUT2: usize = 44;
const COLOR_MODE: usize = 45;

/// Describes a particular resource configuration.
///
/// The configuration is kept as the raw bytes following its `size` field, so fields added by
/// newer platform versions survive a round trip. Missing trailing fields read as zero, and two
/// configurations that only differ in trailing zero bytes are equal.
#[derive(Debug, Clone)]
pub struct ResConfig {
    raw: Vec<u8>,
}

impl Default for ResConfig {
    fn default() -> Self {
        Self {
            raw: vec![0; Self::DEFAULT_SIZE - 4],
        }
    }
}

impl Readable for ResConfig {
    type Args = ();
    fn read<R: Read + Seek>(reader: &mut R, _args: Self::Args) -> StreamResult<Self> {
        let pos = reader.stream_position()?;
        let size = u32::read_no_opts(reader).add_context(|| "read size for ResConfig")?;
        if size < 4 {
            return Err(StreamError::new_string_context(
                format!("invalid config size {size}"),
                pos,
                "validate size for ResConfig",
            ));
        }
        let raw = read_bytes(reader, size as usize - 4).add_context(|| "read data for ResConfig")?;
        Ok(Self { raw })
    }
}

impl Writeable for ResConfig {
    type Args = ();
    fn write<W: Write + Seek>(&self, writer: &mut W, _args: Self::Args) -> StreamResult<()> {
        (self.size() as u32)
            .write_no_opts(writer)
            .add_context(|| "write size for ResConfig")?;
        write_bytes(writer, &self.raw).add_context(|| "write data for ResConfig")
    }
}

impl PartialEq for ResConfig {
    fn eq(&self, other: &Self) -> bool {
        self.trimmed() == other.trimmed()
    }
}

impl Eq for ResConfig {}

impl Hash for ResConfig {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.trimmed().hash(state);
    }
}

impl PartialOrd for ResConfig {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The default configuration sorts first.
impl Ord for ResConfig {
    fn cmp(&self, other: &Self) -> Ordering {
        self.trimmed().cmp(other.trimmed())
    }
}

impl Display for ResConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let qualifiers = self.qualifiers();
        match qualifiers.strip_prefix('-') {
            Some(rest) => write!(f, "{rest}"),
            None => write!(f, "default"),
        }
    }
}

impl ResConfig {
    /// Size written by current aapt2 builds, `size` field included.
    pub const DEFAULT_SIZE: usize = 64;

    pub fn from_raw(raw: Vec<u8>) -> Self {
        Self { raw }
    }

    /// Bytes after the `size` field.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Encoded size, `size` field included.
    pub fn size(&self) -> usize {
        self.raw.len() + 4
    }

    pub fn is_default(&self) -> bool {
        self.trimmed().is_empty()
    }

    fn trimmed(&self) -> &[u8] {
        let end = self
            .raw
            .iter()
            .rposition(|b| *b != 0)
            .map_or(0, |last| last + 1);
        &self.raw[..end]
    }

    fn byte(&self, offset: usize) -> u8 {
        self.raw.get(offset).copied().unwrap_or(0)
    }

    fn short(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.byte(offset), self.byte(offset + 1)])
    }

    fn set_byte(&mut self, offset: usize, value: u8) {
        if offset >= self.raw.len() {
            self.raw.resize(offset + 1, 0);
        }
        self.raw[offset] = value;
    }

    fn set_short(&mut self, offset: usize, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.set_byte(offset, lo);
        self.set_byte(offset + 1, hi);
    }

    pub fn mcc(&self) -> u16 {
        self.short(MCC)
    }

    pub fn mnc(&self) -> u16 {
        self.short(MNC)
    }

    pub fn language(&self) -> String {
        unpack_locale_part([self.byte(LANGUAGE), self.byte(LANGUAGE + 1)], b'a')
    }

    pub fn set_language(&mut self, language: &str) {
        let [a, b] = pack_locale_part(language);
        self.set_byte(LANGUAGE, a);
        self.set_byte(LANGUAGE + 1, b);
    }

    pub fn region(&self) -> String {
        unpack_locale_part([self.byte(COUNTRY), self.byte(COUNTRY + 1)], b'0')
    }

    pub fn set_region(&mut self, region: &str) {
        let [a, b] = pack_locale_part(region);
        self.set_byte(COUNTRY, a);
        self.set_byte(COUNTRY + 1, b);
    }

    pub fn orientation(&self) -> u8 {
        self.byte(ORIENTATION)
    }

    pub fn set_orientation(&mut self, orientation: u8) {
        self.set_byte(ORIENTATION, orientation);
    }

    pub fn density(&self) -> u16 {
        self.short(DENSITY)
    }

    pub fn set_density(&mut self, density: u16) {
        self.set_short(DENSITY, density);
    }

    pub fn sdk_version(&self) -> u16 {
        self.short(SDK_VERSION)
    }

    pub fn set_sdk_version(&mut self, sdk_version: u16) {
        self.set_short(SDK_VERSION, sdk_version);
    }

    pub fn screen_width(&self) -> u16 {
        self.short(SCREEN_WIDTH)
    }

    pub fn screen_height(&self) -> u16 {
        self.short(SCREEN_HEIGHT)
    }

    pub fn smallest_screen_width_dp(&self) -> u16 {
        self.short(SMALLEST_SCREEN_WIDTH_DP)
    }

    pub fn screen_width_dp(&self) -> u16 {
        self.short(SCREEN_WIDTH_DP)
    }

    pub fn screen_height_dp(&self) -> u16 {
        self.short(SCREEN_HEIGHT_DP)
    }

    /// Readable qualifier suffix in aapt order, e.g. `-en-rUS-land-hdpi-v21`. Empty for the
    /// default configuration.
    pub fn qualifiers(&self) -> String {
        let mut out = String::new();
        let mut push = |q: &str| {
            out.push('-');
            out.push_str(q);
        };

        if self.mcc() != 0 {
            push(&format!("mcc{:03}", self.mcc()));
        }
        match self.mnc() {
            0 => {}
            0xffff => push("mnc00"),
            mnc => push(&format!("mnc{mnc:02}")),
        }
        let language = self.language();
        if !language.is_empty() {
            push(&language);
        }
        let region = self.region();
        if !region.is_empty() {
            push(&format!("r{region}"));
        }

        let layout = self.byte(SCREEN_LAYOUT);
        match layout & 0xc0 {
            0x40 => push("ldltr"),
            0x80 => push("ldrtl"),
            _ => {}
        }
        if self.smallest_screen_width_dp() != 0 {
            push(&format!("sw{}dp", self.smallest_screen_width_dp()));
        }
        if self.screen_width_dp() != 0 {
            push(&format!("w{}dp", self.screen_width_dp()));
        }
        if self.screen_height_dp() != 0 {
            push(&format!("h{}dp", self.screen_height_dp()));
        }
        match layout & 0x0f {
            1 => push("small"),
            2 => push("normal"),
            3 => push("large"),
            4 => push("xlarge"),
            _ => {}
        }
        match layout & 0x30 {
            0x10 => push("notlong"),
            0x20 => push("long"),
            _ => {}
        }
        match self.byte(SCREEN_LAYOUT2) & 0x03 {
            1 => push("notround"),
            2 => push("round"),
            _ => {}
        }
        let color = self.byte(COLOR_MODE);
        match color & 0x03 {
            1 => push("nowidecg"),
            2 => push("widecg"),
            _ => {}
        }
        match color & 0x0c {
            0x04 => push("lowdr"),
            0x08 => push("highdr"),
            _ => {}
        }
        match self.orientation() {
            1 => push("port"),
            2 => push("land"),
            3 => push("square"),
            _ => {}
        }
        let ui_mode = self.byte(UI_MODE);
        match ui_mode & 0x0f {
            2 => push("desk"),
            3 => push("car"),
            4 => push("television"),
            5 => push("appliance"),
            6 => push("watch"),
            7 => push("vrheadset"),
            _ => {}
        }
        match ui_mode & 0x30 {
            0x10 => push("notnight"),
            0x20 => push("night"),
            _ => {}
        }
        match self.density() {
            0 => {}
            density => push(&density_name(density)),
        }
        match self.byte(TOUCHSCREEN) {
            1 => push("notouch"),
            2 => push("stylus"),
            3 => push("finger"),
            _ => {}
        }
        let input_flags = self.byte(INPUT_FLAGS);
        match input_flags & 0x03 {
            1 => push("keysexposed"),
            2 => push("keyshidden"),
            3 => push("keyssoft"),
            _ => {}
        }
        match self.byte(KEYBOARD) {
            1 => push("nokeys"),
            2 => push("qwerty"),
            3 => push("12key"),
            _ => {}
        }
        match input_flags & 0x0c {
            0x04 => push("navexposed"),
            0x08 => push("navhidden"),
            _ => {}
        }
        match self.byte(NAVIGATION) {
            1 => push("nonav"),
            2 => push("dpad"),
            3 => push("trackball"),
            4 => push("wheel"),
            _ => {}
        }
        if self.screen_width() != 0 && self.screen_height() != 0 {
            push(&format!("{}x{}", self.screen_width(), self.screen_height()));
        }
        if self.sdk_version() != 0 {
            push(&format!("v{}", self.sdk_version()));
        }
        out
    }
}

pub fn density_name(density: u16) -> String {
    match density {
        120 => "ldpi".to_string(),
        160 => "mdpi".to_string(),
        213 => "tvdpi".to_string(),
        240 => "hdpi".to_string(),
        320 => "xhdpi".to_string(),
        480 => "xxhdpi".to_string(),
        640 => "xxxhdpi".to_string(),
        0xfffe => "anydpi".to_string(),
        0xffff => "nodpi".to_string(),
        other => format!("{other}dpi"),
    }
}

/// Two letter codes are stored as is; three letter codes are packed into 15 bits with the high
/// bit of the first byte set.
fn unpack_locale_part(data: [u8; 2], base: u8) -> String {
    if data[0] & 0x80 != 0 {
        let first = data[1] & 0x1f;
        let second = ((data[1] & 0xe0) >> 5) | ((data[0] & 0x03) << 3);
        let third = (data[0] & 0x7c) >> 2;
        return [first, second, third]
            .iter()
            .map(|c| (c + base) as char)
            .collect();
    }
    data.iter()
        .take_while(|c| **c != 0)
        .map(|c| *c as char)
        .collect()
}

fn pack_locale_part(code: &str) -> [u8; 2] {
    let bytes = code.as_bytes();
    match bytes.len() {
        2 => [bytes[0], bytes[1]],
        3 => {
            let base = if bytes[0].is_ascii_digit() { b'0' } else { b'a' };
            let first = bytes[0].wrapping_sub(base) & 0x1f;
            let second = bytes[1].wrapping_sub(base) & 0x1f;
            let third = bytes[2].wrapping_sub(base) & 0x1f;
            [0x80 | (third << 2) | (second >> 3), (second << 5) | first]
        }
        _ => [0, 0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_zeros_do_not_matter() {
        let short = ResConfig::from_raw(vec![0; 24]);
        let long = ResConfig::default();
        assert_eq!(short, long);
        assert!(short.is_default());

        let mut land = ResConfig::from_raw(vec![0; 24]);
        land.set_orientation(2);
        assert_ne!(land, long);
        assert!(long < land);
    }

    #[test]
    fn qualifiers_follow_aapt_order() {
        let mut config = ResConfig::default();
        config.set_language("en");
        config.set_region("US");
        config.set_orientation(2);
        config.set_density(240);
        config.set_sdk_version(21);
        assert_eq!(config.qualifiers(), "-en-rUS-land-hdpi-v21");
        assert_eq!(config.to_string(), "en-rUS-land-hdpi-v21");
        assert_eq!(ResConfig::default().qualifiers(), "");
    }

    #[test]
    fn three_letter_language_is_packed() {
        let mut config = ResConfig::default();
        config.set_language("fil");
        assert_ne!(config.raw()[LANGUAGE] & 0x80, 0);
        assert_eq!(config.language(), "fil");
    }

    #[test]
    fn density_names() {
        assert_eq!(density_name(0xfffe), "anydpi");
        assert_eq!(density_name(640), "xxxhdpi");
        assert_eq!(density_name(400), "400dpi");
    }
}
