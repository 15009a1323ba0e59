use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::core::LogEntry;
use crate::error::{Result, ScanError};
use crate::event::{window, LogSource};

const LOG_MAGIC: u32 = 0x3147_4C41; // "ALG1"
const LOG_VERSION: u32 = 1;
const HEADER_LEN: u64 = 8;
// 长度字段在校验前就要信任，超过上限一律按截断处理
const MAX_RECORD_LEN: usize = 1 << 20;

fn checksum(data: &[u8]) -> u32 {
    xxhash_rust::xxh3::xxh3_64(data) as u32
}

#[derive(Clone, Debug)]
pub struct AuditLogRead {
    pub entries: Vec<LogEntry>,
    pub truncated_tail_records: usize,
}

/// 按租户分文件的只追加审计日志
///
/// - 文件：`audit-<tenant>.log`
/// - header：magic + version
/// - record：`len u32 | checksum u32 | bincode(LogEntry)`
pub struct AuditLogStore {
    dir: PathBuf,
    // 追加句柄按租户缓存；读取走独立句柄
    writers: Mutex<HashMap<i32, File>>,
}

impl AuditLogStore {
    pub fn open_in_dir(dir: PathBuf) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            writers: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn tenant_file(&self, tenant_id: i32) -> PathBuf {
        self.dir.join(format!("audit-{}.log", tenant_id))
    }

    pub fn append(&self, tenant_id: i32, entries: &[LogEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut writers = self.writers.lock();
        let f = match writers.entry(tenant_id) {
            std::collections::hash_map::Entry::Occupied(o) => o.into_mut(),
            std::collections::hash_map::Entry::Vacant(v) => {
                v.insert(open_or_init(&self.tenant_file(tenant_id))?)
            }
        };
        if let Err(e) = write_records(f, entries) {
            // 句柄作废：下次追加重新打开，先截掉写了一半的记录
            writers.remove(&tenant_id);
            return Err(e);
        }
        Ok(())
    }

    /// 读取租户全部记录；尾部截断/损坏只计数，不报错
    pub fn read_all(&self, tenant_id: i32) -> Result<AuditLogRead> {
        read_log_file(&self.tenant_file(tenant_id))
    }
}

impl LogSource for AuditLogStore {
    fn fetch_entries(
        &self,
        tenant_id: i32,
        since: SystemTime,
        until: SystemTime,
    ) -> Result<Vec<LogEntry>> {
        let read = self
            .read_all(tenant_id)
            .map_err(|e| ScanError::lookup(tenant_id, e))?;
        if read.truncated_tail_records > 0 {
            tracing::warn!(
                "Audit log for tenant {} has {} torn tail record(s), ignoring them",
                tenant_id,
                read.truncated_tail_records
            );
        }
        Ok(window(read.entries.iter(), since, until))
    }
}

fn write_header(f: &mut File) -> std::io::Result<()> {
    f.write_all(&LOG_MAGIC.to_le_bytes())?;
    f.write_all(&LOG_VERSION.to_le_bytes())?;
    f.flush()
}

fn write_records(f: &mut File, entries: &[LogEntry]) -> Result<()> {
    for entry in entries {
        let payload = bincode::serialize(entry)?;
        if payload.len() > MAX_RECORD_LEN {
            return Err(ScanError::Config(format!(
                "audit record for {} exceeds {} bytes",
                entry.resource_path, MAX_RECORD_LEN
            )));
        }
        let len = payload.len() as u32;
        f.write_all(&len.to_le_bytes())?;
        f.write_all(&checksum(&payload).to_le_bytes())?;
        f.write_all(&payload)?;
    }
    f.flush()?;
    Ok(())
}

fn read_header<R: Read>(r: &mut R) -> Option<bool> {
    let mut hdr = [0u8; 8];
    r.read_exact(&mut hdr).ok()?;
    let magic = u32::from_le_bytes([hdr[0], hdr[1], hdr[2], hdr[3]]);
    let ver = u32::from_le_bytes([hdr[4], hdr[5], hdr[6], hdr[7]]);
    Some(magic == LOG_MAGIC && ver == LOG_VERSION)
}

/// 逐条扫描 header 之后的记录
struct FrameScan {
    entries: Vec<LogEntry>,
    truncated: usize,
    /// 最后一条完整记录的结束偏移
    valid_end: u64,
}

fn scan_frames<R: Read>(r: &mut R, path: &Path) -> FrameScan {
    let mut scan = FrameScan {
        entries: Vec::new(),
        truncated: 0,
        valid_end: HEADER_LEN,
    };
    loop {
        let mut lb = [0u8; 8];
        if r.read_exact(&mut lb).is_err() {
            break;
        }
        let len = u32::from_le_bytes([lb[0], lb[1], lb[2], lb[3]]) as usize;
        let crc = u32::from_le_bytes([lb[4], lb[5], lb[6], lb[7]]);
        if len > MAX_RECORD_LEN {
            scan.truncated += 1;
            break;
        }
        let mut buf = vec![0u8; len];
        if r.read_exact(&mut buf).is_err() {
            scan.truncated += 1;
            break;
        }
        if checksum(&buf) != crc {
            // 校验失败：视为截断，停止读取
            scan.truncated += 1;
            break;
        }
        scan.valid_end += 8 + len as u64;
        match bincode::deserialize::<LogEntry>(&buf) {
            Ok(entry) => scan.entries.push(entry),
            Err(e) => {
                tracing::debug!("Skipping undecodable audit record in {:?}: {}", path, e);
            }
        }
    }
    scan
}

fn open_or_init(path: &Path) -> Result<File> {
    let mut f = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)?;

    f.seek(SeekFrom::Start(0))?;
    if read_header(&mut f) == Some(true) {
        // 截掉崩溃留下的半条记录，否则之后追加的记录都读不到
        let scan = scan_frames(&mut BufReader::new(&f), path);
        let len = f.metadata()?.len();
        if len > scan.valid_end {
            tracing::warn!(
                "Truncating {} torn byte(s) at the end of {:?}",
                len - scan.valid_end,
                path
            );
            f.set_len(scan.valid_end)?;
            f.sync_all()?;
        }
        return Ok(f);
    }

    if f.metadata()?.len() > 0 {
        // 不认识的文件不覆盖，避免误删别人的数据
        return Err(ScanError::Config(format!(
            "{:?} is not an audit log (bad header)",
            path
        )));
    }
    write_header(&mut f)?;
    Ok(f)
}

fn read_log_file(path: &Path) -> Result<AuditLogRead> {
    if !path.exists() {
        return Ok(AuditLogRead {
            entries: Vec::new(),
            truncated_tail_records: 0,
        });
    }
    let mut f = BufReader::new(File::open(path)?);

    match read_header(&mut f) {
        None => {
            return Ok(AuditLogRead {
                entries: Vec::new(),
                truncated_tail_records: 0,
            })
        }
        Some(false) => {
            return Err(ScanError::Config(format!(
                "{:?} is not an audit log (bad header)",
                path
            )))
        }
        Some(true) => {}
    }

    let scan = scan_frames(&mut f, path);
    Ok(AuditLogRead {
        entries: scan.entries,
        truncated_tail_records: scan.truncated,
    })
}
