//! Minimal FITS reader/writer: header cards, primary arrays and binary tables.
//! Covers what spectrum files need (SDSS `spec-lite` tables and bare flux
//! arrays); compressed images, heap data and ASCII tables are out of scope.

use crate::core::numeric::linspace;
use crate::domain::model::Spectrum;
use crate::utils::error::{ClassifierError, Result};

pub const BLOCK_SIZE: usize = 2880;
const CARD_SIZE: usize = 80;

/// Primary arrays carry no wavelength axis; they are laid out on this range.
pub const PRIMARY_AXIS_START: f64 = 3000.0;
pub const PRIMARY_AXIS_END: f64 = 10000.0;

#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Logical(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

#[derive(Debug, Clone, Default)]
pub struct Header {
    cards: Vec<(String, HeaderValue)>,
}

impl Header {
    pub fn get(&self, keyword: &str) -> Option<&HeaderValue> {
        self.cards
            .iter()
            .find(|(k, _)| k == keyword)
            .map(|(_, v)| v)
    }

    pub fn get_int(&self, keyword: &str) -> Option<i64> {
        match self.get(keyword)? {
            HeaderValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn get_float(&self, keyword: &str) -> Option<f64> {
        match self.get(keyword)? {
            HeaderValue::Integer(i) => Some(*i as f64),
            HeaderValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn get_text(&self, keyword: &str) -> Option<&str> {
        match self.get(keyword)? {
            HeaderValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    fn require_int(&self, keyword: &str) -> Result<i64> {
        self.get_int(keyword)
            .ok_or_else(|| ClassifierError::fits(format!("missing integer keyword {}", keyword)))
    }

    fn axes(&self) -> Result<Vec<usize>> {
        let naxis = self.require_int("NAXIS")?;
        (1..=naxis)
            .map(|i| {
                let len = self.require_int(&format!("NAXIS{}", i))?;
                usize::try_from(len)
                    .map_err(|_| ClassifierError::fits(format!("negative NAXIS{}", i)))
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
struct HduInfo {
    header: Header,
    data_start: usize,
    data_len: usize,
}

#[derive(Debug, Clone)]
pub struct FitsFile {
    bytes: Vec<u8>,
    hdus: Vec<HduInfo>,
}

impl FitsFile {
    pub fn parse(bytes: Vec<u8>) -> Result<Self> {
        let mut hdus = Vec::new();
        let mut offset = 0;

        while offset < bytes.len() {
            let (header, header_len) = parse_header(&bytes[offset..])?;
            if hdus.is_empty() && header.get("SIMPLE") != Some(&HeaderValue::Logical(true)) {
                return Err(ClassifierError::fits("file does not start with SIMPLE = T"));
            }
            if !hdus.is_empty() && header.get_text("XTENSION").is_none() {
                return Err(ClassifierError::fits(format!(
                    "HDU {} has no XTENSION keyword",
                    hdus.len()
                )));
            }

            let data_start = offset + header_len;
            let data_len = data_size(&header)?;
            let data_end = data_start.checked_add(data_len).ok_or_else(overflow)?;
            if data_end > bytes.len() {
                return Err(ClassifierError::fits(format!(
                    "HDU {} is truncated: needs {} data bytes, {} available",
                    hdus.len(),
                    data_len,
                    bytes.len().saturating_sub(data_start)
                )));
            }

            hdus.push(HduInfo {
                header,
                data_start,
                data_len,
            });
            // data_end 已確認不超過檔案長度，補齊後不會溢位
            offset = data_start + padded(data_len);
        }

        if hdus.is_empty() {
            return Err(ClassifierError::fits("empty file"));
        }
        Ok(Self { bytes, hdus })
    }

    pub fn hdu_count(&self) -> usize {
        self.hdus.len()
    }

    fn data(&self, index: usize) -> &[u8] {
        let hdu = &self.hdus[index];
        &self.bytes[hdu.data_start..hdu.data_start + hdu.data_len]
    }

    /// First row of the primary array as `f64`, with BSCALE/BZERO applied.
    pub fn primary_array(&self) -> Result<Vec<f64>> {
        let header = &self.hdus[0].header;
        let axes = header.axes()?;
        let row_len = match axes.first() {
            Some(&n) if n > 0 => n,
            _ => return Err(ClassifierError::fits("primary HDU has no data array")),
        };

        let bitpix = header.require_int("BITPIX")?;
        let kind = ValueKind::from_bitpix(bitpix)?;
        let scale = header.get_float("BSCALE").unwrap_or(1.0);
        let zero = header.get_float("BZERO").unwrap_or(0.0);

        let data = self.data(0);
        let needed = row_len.checked_mul(kind.size()).ok_or_else(overflow)?;
        if data.len() < needed {
            return Err(ClassifierError::fits(format!(
                "primary array needs {} bytes for its first row, data holds {}",
                needed,
                data.len()
            )));
        }
        Ok((0..row_len)
            .map(|i| zero + scale * kind.read(&data[i * kind.size()..]))
            .collect())
    }

    pub fn table(&self, index: usize) -> Result<BinTable<'_>> {
        let hdu = self
            .hdus
            .get(index)
            .ok_or_else(|| ClassifierError::fits(format!("no HDU {}", index)))?;
        match hdu.header.get_text("XTENSION") {
            Some("BINTABLE") => BinTable::from_header(&hdu.header, self.data(index)),
            other => Err(ClassifierError::fits(format!(
                "HDU {} is {:?}, not a binary table",
                index, other
            ))),
        }
    }
}

fn padded(len: usize) -> usize {
    len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE
}

fn overflow() -> ClassifierError {
    ClassifierError::fits("data size overflows")
}

/// 所有大小皆來自 header，一律以 checked 運算避免溢位
fn data_size(header: &Header) -> Result<usize> {
    let axes = header.axes()?;
    if axes.is_empty() {
        return Ok(0);
    }
    let bitpix = header.require_int("BITPIX")?;
    let bytes_per_value = (bitpix.unsigned_abs() / 8) as usize;
    let pcount =
        usize::try_from(header.get_int("PCOUNT").unwrap_or(0).max(0)).map_err(|_| overflow())?;
    let gcount =
        usize::try_from(header.get_int("GCOUNT").unwrap_or(1).max(1)).map_err(|_| overflow())?;

    let values = axes
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        .and_then(|n| n.checked_add(pcount))
        .ok_or_else(overflow)?;
    values
        .checked_mul(gcount)
        .and_then(|n| n.checked_mul(bytes_per_value))
        .ok_or_else(overflow)
}

/// 回傳 (header, 含補齊的 header 位元組數)
fn parse_header(bytes: &[u8]) -> Result<(Header, usize)> {
    let mut header = Header::default();
    let mut pos = 0;

    loop {
        if pos + CARD_SIZE > bytes.len() {
            return Err(ClassifierError::fits("header has no END card"));
        }
        let card = String::from_utf8_lossy(&bytes[pos..pos + CARD_SIZE]);
        pos += CARD_SIZE;

        let keyword = card.get(..8).unwrap_or(&card).trim_end().to_string();
        if keyword == "END" {
            break;
        }
        if card.get(8..10) != Some("= ") {
            continue;
        }
        if let Some(value) = parse_value(card.get(10..).unwrap_or("")) {
            header.cards.push((keyword, value));
        }
    }

    Ok((header, padded(pos)))
}

fn parse_value(raw: &str) -> Option<HeaderValue> {
    let raw = raw.trim_start();
    if let Some(rest) = raw.strip_prefix('\'') {
        // '' 代表字串內的單引號
        let mut text = String::new();
        let mut chars = rest.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    text.push('\'');
                } else {
                    break;
                }
            } else {
                text.push(c);
            }
        }
        return Some(HeaderValue::Text(text.trim_end().to_string()));
    }

    let value = raw.split('/').next().unwrap_or("").trim();
    match value {
        "" => None,
        "T" => Some(HeaderValue::Logical(true)),
        "F" => Some(HeaderValue::Logical(false)),
        _ => value
            .parse::<i64>()
            .map(HeaderValue::Integer)
            .or_else(|_| value.replace(['D', 'd'], "E").parse::<f64>().map(HeaderValue::Float))
            .ok()
            .or_else(|| Some(HeaderValue::Text(value.to_string()))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    U8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl ValueKind {
    fn from_bitpix(bitpix: i64) -> Result<Self> {
        match bitpix {
            8 => Ok(Self::U8),
            16 => Ok(Self::I16),
            32 => Ok(Self::I32),
            64 => Ok(Self::I64),
            -32 => Ok(Self::F32),
            -64 => Ok(Self::F64),
            other => Err(ClassifierError::fits(format!("unsupported BITPIX {}", other))),
        }
    }

    fn size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::I16 => 2,
            Self::I32 | Self::F32 => 4,
            Self::I64 | Self::F64 => 8,
        }
    }

    /// FITS 一律為 big-endian；呼叫端保證 `bytes` 長度足夠
    fn read(self, bytes: &[u8]) -> f64 {
        fn take<const N: usize>(bytes: &[u8]) -> [u8; N] {
            let mut buf = [0u8; N];
            buf.copy_from_slice(&bytes[..N]);
            buf
        }
        match self {
            Self::U8 => bytes[0] as f64,
            Self::I16 => i16::from_be_bytes(take(bytes)) as f64,
            Self::I32 => i32::from_be_bytes(take(bytes)) as f64,
            Self::I64 => i64::from_be_bytes(take(bytes)) as f64,
            Self::F32 => f32::from_be_bytes(take(bytes)) as f64,
            Self::F64 => f64::from_be_bytes(take(bytes)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    repeat: usize,
    kind: Option<ValueKind>,
    offset: usize,
    scale: f64,
    zero: f64,
}

#[derive(Debug, Clone)]
pub struct BinTable<'a> {
    columns: Vec<Column>,
    row_len: usize,
    n_rows: usize,
    data: &'a [u8],
}

impl<'a> BinTable<'a> {
    fn from_header(header: &Header, data: &'a [u8]) -> Result<Self> {
        let row_len = usize::try_from(header.require_int("NAXIS1")?)
            .map_err(|_| ClassifierError::fits("negative NAXIS1"))?;
        let n_rows = usize::try_from(header.require_int("NAXIS2")?)
            .map_err(|_| ClassifierError::fits("negative NAXIS2"))?;
        let n_fields = header.require_int("TFIELDS")?;

        let mut columns = Vec::new();
        let mut offset = 0;
        for i in 1..=n_fields {
            let tform = header
                .get_text(&format!("TFORM{}", i))
                .ok_or_else(|| ClassifierError::fits(format!("missing TFORM{}", i)))?;
            let (repeat, code) = parse_tform(tform)?;
            let (kind, width) = column_layout(code, repeat)?;

            columns.push(Column {
                name: header
                    .get_text(&format!("TTYPE{}", i))
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("COL{}", i)),
                repeat,
                kind,
                offset,
                scale: header.get_float(&format!("TSCAL{}", i)).unwrap_or(1.0),
                zero: header.get_float(&format!("TZERO{}", i)).unwrap_or(0.0),
            });
            offset = offset.checked_add(width).ok_or_else(overflow)?;
        }

        if offset != row_len {
            return Err(ClassifierError::fits(format!(
                "column widths add up to {} bytes but NAXIS1 is {}",
                offset, row_len
            )));
        }
        let table_len = row_len.checked_mul(n_rows).ok_or_else(overflow)?;
        if data.len() < table_len {
            return Err(ClassifierError::fits("table data shorter than NAXIS1 * NAXIS2"));
        }

        Ok(Self {
            columns,
            row_len,
            n_rows,
            data,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// 欄位名稱比對不分大小寫
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.find_column(name).is_some()
    }

    /// Numeric column flattened row by row (vector cells contribute all
    /// elements), with TSCAL/TZERO applied.
    pub fn column_f64(&self, name: &str) -> Result<Vec<f64>> {
        let column = self
            .find_column(name)
            .ok_or_else(|| ClassifierError::fits(format!("table has no column '{}'", name)))?;
        let kind = column.kind.ok_or_else(|| {
            ClassifierError::fits(format!("column '{}' is not numeric", column.name))
        })?;

        let mut values = Vec::with_capacity(self.n_rows * column.repeat);
        for row in 0..self.n_rows {
            let base = row * self.row_len + column.offset;
            for k in 0..column.repeat {
                let raw = kind.read(&self.data[base + k * kind.size()..]);
                values.push(column.zero + column.scale * raw);
            }
        }
        Ok(values)
    }
}

fn parse_tform(tform: &str) -> Result<(usize, char)> {
    let tform = tform.trim();
    let digits: String = tform.chars().take_while(|c| c.is_ascii_digit()).collect();
    let code = tform[digits.len()..]
        .chars()
        .next()
        .ok_or_else(|| ClassifierError::fits(format!("malformed TFORM '{}'", tform)))?;
    let repeat = if digits.is_empty() {
        1
    } else {
        digits
            .parse()
            .map_err(|_| ClassifierError::fits(format!("malformed TFORM '{}'", tform)))?
    };
    Ok((repeat, code.to_ascii_uppercase()))
}

/// (數值型別, 欄寬位元組)
fn column_layout(code: char, repeat: usize) -> Result<(Option<ValueKind>, usize)> {
    let (kind, width) = match code {
        'B' => (Some(ValueKind::U8), Some(repeat)),
        'I' => (Some(ValueKind::I16), repeat.checked_mul(2)),
        'J' => (Some(ValueKind::I32), repeat.checked_mul(4)),
        'K' => (Some(ValueKind::I64), repeat.checked_mul(8)),
        'E' => (Some(ValueKind::F32), repeat.checked_mul(4)),
        'D' => (Some(ValueKind::F64), repeat.checked_mul(8)),
        'L' | 'A' => (None, Some(repeat)),
        'X' => (None, Some(repeat.div_ceil(8))),
        'C' | 'P' => (None, repeat.checked_mul(8)),
        'M' | 'Q' => (None, repeat.checked_mul(16)),
        other => {
            return Err(ClassifierError::fits(format!(
                "unsupported TFORM type '{}'",
                other
            )))
        }
    };
    Ok((kind, width.ok_or_else(overflow)?))
}

/// Flux and log10-wavelength columns of the table in HDU 1.
pub fn read_table_spectrum(fits: &FitsFile) -> Result<Spectrum> {
    let table = fits.table(1)?;
    let flux = table.column_f64("flux")?;
    let loglam = table.column_f64("loglam")?;
    let wavelength = loglam.iter().map(|l| 10f64.powf(*l)).collect();
    Spectrum::new(wavelength, flux)
}

/// Local files: a `FLUX` table in HDU 1 when present, otherwise the primary
/// array as flux on a uniform 3000–10000 Å axis.
pub fn read_local_spectrum(fits: &FitsFile) -> Result<Spectrum> {
    let has_flux_table = fits.hdu_count() > 1
        && fits
            .table(1)
            .map(|t| t.has_column("FLUX"))
            .unwrap_or(false);

    if has_flux_table {
        tracing::debug!("Reading FLUX/LOGLAM columns from HDU 1");
        return read_table_spectrum(fits);
    }

    tracing::debug!("Reading primary array as flux with a synthesized wavelength axis");
    let flux = fits.primary_array()?;
    let wavelength = linspace(PRIMARY_AXIS_START, PRIMARY_AXIS_END, flux.len());
    Spectrum::new(wavelength, flux)
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatFormat {
    /// TFORM `E`
    Single,
    /// TFORM `D`
    Double,
}

#[derive(Debug, Clone)]
pub struct TableColumn<'a> {
    pub name: &'a str,
    pub format: FloatFormat,
    pub values: &'a [f64],
}

#[derive(Debug, Default)]
pub(crate) struct HeaderWriter {
    buf: Vec<u8>,
}

impl HeaderWriter {
    pub(crate) fn card(&mut self, keyword: &str, value: &str) {
        let card = format!("{:<8}= {:>20}", keyword, value);
        self.push(&card);
    }

    fn text(&mut self, keyword: &str, value: &str) {
        let quoted = format!("'{:<8}'", value.replace('\'', "''"));
        let card = format!("{:<8}= {:<20}", keyword, quoted);
        self.push(&card);
    }

    fn push(&mut self, card: &str) {
        let mut bytes = card.as_bytes().to_vec();
        bytes.resize(CARD_SIZE, b' ');
        self.buf.extend_from_slice(&bytes[..CARD_SIZE]);
    }

    pub(crate) fn finish(mut self) -> Vec<u8> {
        self.push("END");
        let len = padded(self.buf.len());
        self.buf.resize(len, b' ');
        self.buf
    }
}

fn pad_data(mut data: Vec<u8>) -> Vec<u8> {
    let len = padded(data.len());
    data.resize(len, 0);
    data
}

/// Single-HDU file whose primary array is `flux` as 64-bit floats.
pub fn write_primary_array(flux: &[f64]) -> Vec<u8> {
    let mut header = HeaderWriter::default();
    header.card("SIMPLE", "T");
    header.card("BITPIX", "-64");
    header.card("NAXIS", "1");
    header.card("NAXIS1", &flux.len().to_string());

    let data: Vec<u8> = flux.iter().flat_map(|v| v.to_be_bytes()).collect();
    let mut out = header.finish();
    out.extend(pad_data(data));
    out
}

/// Empty primary HDU followed by a binary table holding `columns`.
pub fn write_table(columns: &[TableColumn<'_>]) -> Result<Vec<u8>> {
    let n_rows = columns.first().map(|c| c.values.len()).unwrap_or(0);
    if columns.iter().any(|c| c.values.len() != n_rows) {
        return Err(ClassifierError::fits("table columns must have equal length"));
    }

    let mut primary = HeaderWriter::default();
    primary.card("SIMPLE", "T");
    primary.card("BITPIX", "8");
    primary.card("NAXIS", "0");
    primary.card("EXTEND", "T");

    let width = |f: FloatFormat| match f {
        FloatFormat::Single => 4,
        FloatFormat::Double => 8,
    };
    let row_len: usize = columns.iter().map(|c| width(c.format)).sum();

    let mut table = HeaderWriter::default();
    table.text("XTENSION", "BINTABLE");
    table.card("BITPIX", "8");
    table.card("NAXIS", "2");
    table.card("NAXIS1", &row_len.to_string());
    table.card("NAXIS2", &n_rows.to_string());
    table.card("PCOUNT", "0");
    table.card("GCOUNT", "1");
    table.card("TFIELDS", &columns.len().to_string());
    for (i, column) in columns.iter().enumerate() {
        table.text(&format!("TTYPE{}", i + 1), column.name);
        let code = match column.format {
            FloatFormat::Single => "E",
            FloatFormat::Double => "D",
        };
        table.text(&format!("TFORM{}", i + 1), code);
    }

    let mut data = Vec::with_capacity(row_len * n_rows);
    for row in 0..n_rows {
        for column in columns {
            let v = column.values[row];
            match column.format {
                FloatFormat::Single => data.extend((v as f32).to_be_bytes()),
                FloatFormat::Double => data.extend(v.to_be_bytes()),
            }
        }
    }

    let mut out = primary.finish();
    out.extend(table.finish());
    out.extend(pad_data(data));
    Ok(out)
}
