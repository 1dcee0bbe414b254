//! Level 5 MAT files on disk.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use log::debug;

use crate::error::{Error, Result};

use super::class::{MatClass, MiType};
use super::layer::{MatLayer, MatSink, MatSource};
use super::var::{
    Compression, MatData, MatHeader, MatVar, HEADER_LEN, HEADER_TEXT_LEN, VERSION_5, VERSION_73,
};

const FLAG_COMPLEX: u32 = 0x0800;

/// [`MatLayer`] over `std::fs` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLayer;

impl MatLayer for FileLayer {
    type Sink = FileSink;
    type Source = FileSource;

    fn create(&self, path: &Path, header: &MatHeader) -> Result<FileSink> {
        let file = File::create(path).map_err(|e| Error::open_failed(path, e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(&encode_header(header))
            .map_err(|e| Error::open_failed(path, e))?;
        debug!("created MAT file '{}'", path.display());
        Ok(FileSink {
            writer: Some(writer),
            path: path.to_path_buf(),
        })
    }

    fn open(&self, path: &Path) -> Result<FileSource> {
        let file = File::open(path).map_err(|e| Error::open_failed(path, e))?;
        let mut reader = BufReader::new(file);
        let mut buf = [0u8; HEADER_LEN];
        reader
            .read_exact(&mut buf)
            .map_err(|e| Error::open_failed(path, format!("incomplete header: {}", e)))?;
        let header = decode_header(&buf).map_err(|reason| Error::open_failed(path, reason))?;
        debug!(
            "opened MAT file '{}' ({})",
            path.display(),
            if header.big_endian { "big-endian" } else { "little-endian" }
        );
        Ok(FileSource {
            reader: Some(reader),
            header,
            path: path.to_path_buf(),
        })
    }
}

/// A MAT file open for writing.
#[derive(Debug)]
pub struct FileSink {
    writer: Option<BufWriter<File>>,
    path: PathBuf,
}

impl MatSink for FileSink {
    fn write_var(&mut self, var: &MatVar, compression: Compression) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or(Error::invalid_state("MAT file has been closed"))?;
        let element = encode_element(var, compression)?;
        writer.write_all(&element)?;
        debug!(
            "wrote variable '{}' ({} bytes) to '{}'",
            var.name,
            element.len(),
            self.path.display()
        );
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

/// A MAT file open for reading.
#[derive(Debug)]
pub struct FileSource {
    reader: Option<BufReader<File>>,
    header: MatHeader,
    path: PathBuf,
}

impl MatSource for FileSource {
    fn header(&self) -> &MatHeader {
        &self.header
    }

    fn read_next(&mut self) -> Result<Option<MatVar>> {
        let big_endian = self.header.big_endian;
        let reader = self
            .reader
            .as_mut()
            .ok_or(Error::invalid_state("MAT file has been closed"))?;

        loop {
            let mut tag = [0u8; 8];
            if !read_tag(reader, &mut tag)? {
                return Ok(None);
            }
            let ty = read_u32(&tag[..4], big_endian);
            if ty >> 16 != 0 {
                // A small element can't hold a variable.
                continue;
            }
            let size = read_u32(&tag[4..], big_endian) as usize;
            let mut data = Vec::new();
            reader.by_ref().take(size as u64).read_to_end(&mut data)?;
            if data.len() != size {
                return Err(Error::invalid_format("truncated data element"));
            }

            match MiType::from_code(ty) {
                Some(MiType::Compressed) => {
                    let mut inflated = Vec::new();
                    ZlibDecoder::new(data.as_slice())
                        .read_to_end(&mut inflated)
                        .map_err(|e| Error::invalid_format(format!("bad compressed element: {}", e)))?;
                    let mut inner = Elements::new(&inflated, big_endian);
                    while let Some((inner_ty, body)) = inner.next()? {
                        if inner_ty == MiType::Matrix.code() {
                            return parse_matrix(body, big_endian).map(Some);
                        }
                    }
                }
                Some(MiType::Matrix) => {
                    skip_padding(reader, size)?;
                    return parse_matrix(&data, big_endian).map(Some);
                }
                _ => {
                    skip_padding(reader, size)?;
                    debug!(
                        "skipping element of type {} in '{}'",
                        ty,
                        self.path.display()
                    );
                }
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.reader.take();
        Ok(())
    }
}

fn encode_header(header: &MatHeader) -> [u8; HEADER_LEN] {
    let mut buf = [b' '; HEADER_LEN];
    let text = header.text.as_bytes();
    let len = text.len().min(HEADER_TEXT_LEN);
    buf[..len].copy_from_slice(&text[..len]);
    buf[HEADER_TEXT_LEN..124].fill(0);
    buf[124..126].copy_from_slice(&header.version.to_le_bytes());
    buf[126..128].copy_from_slice(b"IM");
    buf
}

fn decode_header(buf: &[u8; HEADER_LEN]) -> std::result::Result<MatHeader, String> {
    let big_endian = match &buf[126..128] {
        b"IM" => false,
        b"MI" => true,
        _ => return Err("not a Level 5 MAT file".to_string()),
    };
    let raw_version = [buf[124], buf[125]];
    let version = if big_endian {
        u16::from_be_bytes(raw_version)
    } else {
        u16::from_le_bytes(raw_version)
    };
    match version {
        VERSION_5 => {}
        VERSION_73 => return Err("v7.3 (HDF5) MAT files are not supported".to_string()),
        other => return Err(format!("unsupported MAT version 0x{:04x}", other)),
    }
    let text = String::from_utf8_lossy(&buf[..HEADER_TEXT_LEN])
        .trim_end_matches([' ', '\0'])
        .to_string();
    Ok(MatHeader {
        text,
        version,
        big_endian,
    })
}

/// Encode a top-level variable, compressing it if asked.
fn encode_element(var: &MatVar, compression: Compression) -> Result<Vec<u8>> {
    let mut matrix = Vec::new();
    write_matrix(var, &var.name, &mut matrix)?;

    match compression {
        Compression::None => Ok(matrix),
        Compression::Default => {
            let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(&matrix)?;
            let compressed = encoder.finish()?;
            let mut out = Vec::with_capacity(compressed.len() + 8);
            push_tag(&mut out, MiType::Compressed.code(), compressed.len(), &var.name)?;
            out.extend_from_slice(&compressed);
            Ok(out)
        }
    }
}

/// Append `var` as an miMATRIX element. Errors name `field`, the top-level
/// variable being written.
fn write_matrix(var: &MatVar, field: &str, out: &mut Vec<u8>) -> Result<()> {
    let mut body = Vec::new();

    let mut flags = u32::from(var.class);
    if var.complex {
        flags |= FLAG_COMPLEX;
    }
    let mut flag_bytes = flags.to_le_bytes().to_vec();
    flag_bytes.extend_from_slice(&0u32.to_le_bytes());
    write_element(&mut body, MiType::UInt32, &flag_bytes, field)?;

    let mut dims = Vec::with_capacity(var.dims.len() * 4);
    for &d in &var.dims {
        let d = i32::try_from(d).map_err(|_| {
            Error::variable_write(field, format!("dimension {} exceeds the MAT limit", d))
        })?;
        dims.extend_from_slice(&d.to_le_bytes());
    }
    write_element(&mut body, MiType::Int32, &dims, field)?;
    write_element(&mut body, MiType::Int8, var.name.as_bytes(), field)?;

    match &var.data {
        MatData::Numeric { stored, bytes } => write_element(&mut body, *stored, bytes, field)?,
        MatData::Struct {
            field_names,
            elements,
        } => {
            let width = field_names.iter().map(String::len).max().unwrap_or(0) + 1;
            let raw_width = i32::try_from(width)
                .map_err(|_| Error::variable_write(field, "field name too long"))?;
            write_small(&mut body, MiType::Int32, &raw_width.to_le_bytes());
            let mut names = Vec::with_capacity(width * field_names.len());
            for name in field_names {
                names.extend_from_slice(name.as_bytes());
                names.resize(names.len() + width - name.len(), 0);
            }
            write_element(&mut body, MiType::Int8, &names, field)?;
            for element in elements {
                write_matrix(element, field, &mut body)?;
            }
        }
        MatData::Cell(items) => {
            for item in items {
                write_matrix(item, field, &mut body)?;
            }
        }
        MatData::Opaque => {}
    }

    push_tag(out, MiType::Matrix.code(), body.len(), field)?;
    out.extend_from_slice(&body);
    Ok(())
}

fn push_tag(out: &mut Vec<u8>, ty: u32, len: usize, field: &str) -> Result<()> {
    let len = u32::try_from(len)
        .map_err(|_| Error::variable_write(field, "data element exceeds 4 GiB"))?;
    out.extend_from_slice(&ty.to_le_bytes());
    out.extend_from_slice(&len.to_le_bytes());
    Ok(())
}

fn write_element(out: &mut Vec<u8>, ty: MiType, data: &[u8], field: &str) -> Result<()> {
    push_tag(out, ty.code(), data.len(), field)?;
    out.extend_from_slice(data);
    out.resize(out.len() + padding(data.len()), 0);
    Ok(())
}

/// Small data element format: size and type share the first four bytes.
fn write_small(out: &mut Vec<u8>, ty: MiType, data: &[u8; 4]) {
    let word = ((data.len() as u32) << 16) | ty.code();
    out.extend_from_slice(&word.to_le_bytes());
    out.extend_from_slice(data);
}

fn padding(len: usize) -> usize {
    (8 - len % 8) % 8
}

fn read_u32(bytes: &[u8], big_endian: bool) -> u32 {
    let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
    if big_endian {
        u32::from_be_bytes(raw)
    } else {
        u32::from_le_bytes(raw)
    }
}

/// Fill `tag`, returning `false` on a clean end of file.
fn read_tag<R: Read>(reader: &mut R, tag: &mut [u8; 8]) -> Result<bool> {
    let mut filled = 0;
    while filled < tag.len() {
        match reader.read(&mut tag[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    match filled {
        0 => Ok(false),
        8 => Ok(true),
        _ => Err(Error::invalid_format("truncated element tag")),
    }
}

fn skip_padding<R: Read>(reader: &mut R, size: usize) -> Result<()> {
    io::copy(&mut reader.take(padding(size) as u64), &mut io::sink())?;
    Ok(())
}

/// Walks the data elements packed in a byte buffer.
struct Elements<'a> {
    buf: &'a [u8],
    pos: usize,
    big_endian: bool,
}

impl<'a> Elements<'a> {
    fn new(buf: &'a [u8], big_endian: bool) -> Self {
        Elements {
            buf,
            pos: 0,
            big_endian,
        }
    }

    fn next(&mut self) -> Result<Option<(u32, &'a [u8])>> {
        let rest = &self.buf[self.pos.min(self.buf.len())..];
        if rest.is_empty() {
            return Ok(None);
        }
        if rest.len() < 8 {
            return Err(Error::invalid_format("truncated element tag"));
        }

        let first = read_u32(rest, self.big_endian);
        if first >> 16 != 0 {
            let size = (first >> 16) as usize;
            if size > 4 {
                return Err(Error::invalid_format("small element larger than 4 bytes"));
            }
            self.pos += 8;
            return Ok(Some((first & 0xffff, &rest[4..4 + size])));
        }

        let size = read_u32(&rest[4..], self.big_endian) as usize;
        if rest.len() - 8 < size {
            return Err(Error::invalid_format("truncated data element"));
        }
        let end = 8 + size;
        self.pos += end + padding(size);
        Ok(Some((first, &rest[8..end])))
    }

    /// Bytes left to walk.
    fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    fn require(&mut self, what: &str) -> Result<(u32, &'a [u8])> {
        self.next()?
            .ok_or_else(|| Error::invalid_format(format!("missing {}", what)))
    }
}

fn parse_matrix(data: &[u8], big_endian: bool) -> Result<MatVar> {
    if data.is_empty() {
        return Ok(MatVar::empty(""));
    }
    let mut elements = Elements::new(data, big_endian);

    let (_, flags) = elements.require("array flags")?;
    if flags.len() < 4 {
        return Err(Error::invalid_format("short array flags"));
    }
    let flags = read_u32(flags, big_endian);
    let class = (flags & 0xff) as u8;
    let complex = flags & FLAG_COMPLEX != 0;

    let (_, raw_dims) = elements.require("dimensions")?;
    let dims = raw_dims
        .chunks_exact(4)
        .map(|c| {
            usize::try_from(read_u32(c, big_endian) as i32)
                .map_err(|_| Error::invalid_format("negative dimension"))
        })
        .collect::<Result<Vec<_>>>()?;
    let numel = dims
        .iter()
        .try_fold(1usize, |n, &d| n.checked_mul(d))
        .ok_or_else(|| Error::invalid_format("dimension overflow"))?;

    let (_, raw_name) = elements.require("array name")?;
    let name = String::from_utf8(raw_name.to_vec())
        .map_err(|_| Error::invalid_format("array name is not UTF-8"))?;

    let data = match MatClass::from_code(class) {
        Some(MatClass::Struct) => {
            let (_, raw_width) = elements.require("field name length")?;
            let width = if raw_width.len() >= 4 {
                read_u32(raw_width, big_endian) as usize
            } else {
                0
            };
            if width == 0 {
                return Err(Error::invalid_format("bad field name length"));
            }
            let (_, raw_names) = elements.require("field names")?;
            let field_names = raw_names
                .chunks(width)
                .map(|chunk| {
                    let end = chunk.iter().position(|&b| b == 0).unwrap_or(chunk.len());
                    String::from_utf8(chunk[..end].to_vec())
                        .map_err(|_| Error::invalid_format("field name is not UTF-8"))
                })
                .collect::<Result<Vec<_>>>()?;
            let count = numel
                .checked_mul(field_names.len())
                .ok_or_else(|| Error::invalid_format("dimension overflow"))?;
            let values = parse_children(&mut elements, count, big_endian)?;
            MatData::Struct {
                field_names,
                elements: values,
            }
        }
        Some(MatClass::Cell) => MatData::Cell(parse_children(&mut elements, numel, big_endian)?),
        Some(c) if c.has_numeric_data() => match elements.next()? {
            Some((ty, body)) => {
                let stored = MiType::from_code(ty)
                    .ok_or_else(|| Error::unknown_type(format!("data element type {}", ty)))?;
                let mut bytes = body.to_vec();
                if big_endian {
                    swap_units(&mut bytes, stored.unit_bytes());
                }
                MatData::Numeric { stored, bytes }
            }
            None => MatData::Numeric {
                stored: c.data_type().map_or(MiType::UInt8, MiType::from_data_type),
                bytes: Vec::new(),
            },
        },
        _ => MatData::Opaque,
    };

    Ok(MatVar {
        name,
        class,
        dims,
        complex,
        data,
    })
}

fn parse_children(elements: &mut Elements<'_>, count: usize, big_endian: bool) -> Result<Vec<MatVar>> {
    // Every nested array takes at least a tag.
    if count > elements.remaining() / 8 {
        return Err(Error::invalid_format(format!(
            "{} nested arrays can't fit in {} bytes",
            count,
            elements.remaining()
        )));
    }
    let mut children = Vec::with_capacity(count);
    for _ in 0..count {
        let (ty, body) = elements.require("nested array")?;
        if ty != MiType::Matrix.code() {
            return Err(Error::invalid_format(format!(
                "expected a nested array, found element type {}",
                ty
            )));
        }
        children.push(parse_matrix(body, big_endian)?);
    }
    Ok(children)
}

fn swap_units(bytes: &mut [u8], width: usize) {
    if width > 1 {
        for unit in bytes.chunks_exact_mut(width) {
            unit.reverse();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(name: &str, value: f64) -> MatVar {
        MatVar {
            name: name.into(),
            class: MatClass::Double.code(),
            dims: vec![1, 1],
            complex: false,
            data: MatData::Numeric {
                stored: MiType::Double,
                bytes: value.to_le_bytes().to_vec(),
            },
        }
    }

    fn write_and_read(vars: &[MatVar], compression: Compression) -> (MatHeader, Vec<MatVar>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.mat");

        let mut sink = FileLayer.create(&path, &MatHeader::new(Some("T")).unwrap()).unwrap();
        for var in vars {
            sink.write_var(var, compression).unwrap();
        }
        sink.close().unwrap();

        let mut source = FileLayer.open(&path).unwrap();
        let mut read = Vec::new();
        while let Some(var) = source.read_next().unwrap() {
            read.push(var);
        }
        source.close().unwrap();
        (source.header().clone(), read)
    }

    #[test]
    fn test_round_trip_plain_and_compressed() {
        let vars = vec![scalar("a", 1.5), scalar("bb", -2.0)];
        for compression in [Compression::None, Compression::Default] {
            let (header, read) = write_and_read(&vars, compression);
            assert_eq!(header.class_name(), Some("T"));
            assert_eq!(read, vars);
        }
    }

    #[test]
    fn test_struct_and_cell_layout() {
        let record = MatVar {
            name: "s".into(),
            class: MatClass::Struct.code(),
            dims: vec![1, 1],
            complex: false,
            data: MatData::Struct {
                field_names: vec!["x".into(), "longer".into()],
                elements: vec![scalar("", 1.0), scalar("", 2.0)],
            },
        };
        let cell = MatVar {
            name: "c".into(),
            class: MatClass::Cell.code(),
            dims: vec![1, 2],
            complex: false,
            data: MatData::Cell(vec![scalar("", 3.0), MatVar::empty("")]),
        };
        let (_, read) = write_and_read(&[record.clone(), cell.clone()], Compression::None);
        assert_eq!(read, vec![record, cell]);
    }

    #[test]
    fn test_big_endian_with_small_name() {
        fn be_element(ty: u32, data: &[u8]) -> Vec<u8> {
            let mut out = ty.to_be_bytes().to_vec();
            out.extend_from_slice(&(data.len() as u32).to_be_bytes());
            out.extend_from_slice(data);
            out.resize(out.len() + padding(data.len()), 0);
            out
        }

        let mut body = be_element(6, &[0, 0, 0, 6, 0, 0, 0, 0]);
        body.extend(be_element(5, &[0, 0, 0, 1, 0, 0, 0, 1]));
        body.extend_from_slice(&[0, 1, 0, 1, b'x', 0, 0, 0]);
        body.extend(be_element(9, &1.5f64.to_be_bytes()));

        let mut file = vec![b' '; HEADER_LEN];
        file[124..126].copy_from_slice(&[0x01, 0x00]);
        file[126..128].copy_from_slice(b"MI");
        file.extend(be_element(14, &body));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("be.mat");
        std::fs::write(&path, file).unwrap();

        let mut source = FileLayer.open(&path).unwrap();
        assert!(source.header().big_endian);
        assert_eq!(source.read_next().unwrap(), Some(scalar("x", 1.5)));
        assert_eq!(source.read_next().unwrap(), None);
    }

    fn read_first(path: &Path) -> Result<Option<MatVar>> {
        let mut source = FileLayer.open(path)?;
        source.read_next()
    }

    #[test]
    fn test_corrupt_dimensions_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dims.mat");
        for dims in [vec![0x7fff_ffff; 3], vec![0x7fff_ffff, 1]] {
            let cell = MatVar {
                name: "c".into(),
                class: MatClass::Cell.code(),
                dims,
                complex: false,
                data: MatData::Cell(Vec::new()),
            };
            let mut sink = FileLayer.create(&path, &MatHeader::new(None).unwrap()).unwrap();
            sink.write_var(&cell, Compression::None).unwrap();
            sink.close().unwrap();

            assert!(matches!(read_first(&path), Err(Error::InvalidFormat { .. })));
        }
    }

    #[test]
    fn test_oversized_tag_rejected() {
        let mut file = encode_header(&MatHeader::new(None).unwrap()).to_vec();
        file.extend_from_slice(&MiType::Matrix.code().to_le_bytes());
        file.extend_from_slice(&u32::MAX.to_le_bytes());
        file.extend_from_slice(&[0; 16]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tag.mat");
        std::fs::write(&path, file).unwrap();

        let err = read_first(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat { reason } if reason.contains("truncated")));
    }

    #[test]
    fn test_oversized_dimension_refused() {
        let mut var = MatVar::empty("big");
        var.dims = vec![i32::MAX as usize + 1, 0];
        let err = encode_element(&var, Compression::None).unwrap_err();
        assert!(matches!(err, Error::VariableWrite { field, .. } if field == "big"));

        let nested = MatVar {
            name: "outer".into(),
            class: MatClass::Cell.code(),
            dims: vec![1, 1],
            complex: false,
            data: MatData::Cell(vec![var]),
        };
        let err = encode_element(&nested, Compression::Default).unwrap_err();
        assert!(matches!(err, Error::VariableWrite { field, .. } if field == "outer"));
    }

    #[test]
    fn test_tag_length_checked() {
        let mut out = Vec::new();
        assert!(push_tag(&mut out, MiType::Int8.code(), u32::MAX as usize, "x").is_ok());
        let err = push_tag(&mut out, MiType::Int8.code(), u32::MAX as usize + 1, "x").unwrap_err();
        assert!(matches!(err, Error::VariableWrite { field, .. } if field == "x"));
        assert_eq!(out.len(), 8);
    }

    #[test]
    fn test_rejects_hdf5_and_garbage() {
        let dir = tempfile::tempdir().unwrap();

        let mut v73 = [b' '; HEADER_LEN];
        v73[124..126].copy_from_slice(&VERSION_73.to_le_bytes());
        v73[126..128].copy_from_slice(b"IM");
        let path = dir.path().join("v73.mat");
        std::fs::write(&path, v73).unwrap();
        let err = FileLayer.open(&path).unwrap_err();
        assert!(matches!(err, Error::ContainerOpen { reason, .. } if reason.contains("HDF5")));

        let path = dir.path().join("junk.mat");
        std::fs::write(&path, b"hello").unwrap();
        assert!(matches!(FileLayer.open(&path), Err(Error::ContainerOpen { .. })));
    }

    #[test]
    fn test_write_after_close() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FileLayer
            .create(&dir.path().join("c.mat"), &MatHeader::new(None).unwrap())
            .unwrap();
        sink.close().unwrap();
        let err = sink.write_var(&scalar("a", 0.0), Compression::None).unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
    }
}
