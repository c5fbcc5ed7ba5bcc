use std::{collections::BTreeMap, path::Path, sync::Arc};

use anyhow::{bail, Context, Result};

use crate::{
    io::csv::{read_csv, text_column},
    map::{Level, ParentRef, UnitCode},
};

/// Maps a unit to its parent one level up.
pub trait Crosswalk {
    /// Level of the parents this crosswalk produces.
    fn parent_level(&self) -> Level;

    /// Parent of `code`, or `None` if the crosswalk has no entry.
    fn parent(&self, code: &UnitCode) -> Option<ParentRef>;
}

/// (prefecture code, prefecture name, block id, block name)
const PREF_BLOCK_ROWS: [(&str, &str, u8, &str); 47] = [
    ("01", "北海道", 1, "北海道"), ("02", "青森県", 2, "東北"), ("03", "岩手県", 2, "東北"),
    ("04", "宮城県", 2, "東北"), ("05", "秋田県", 2, "東北"), ("06", "山形県", 2, "東北"),
    ("07", "福島県", 2, "東北"), ("08", "茨城県", 3, "北関東"), ("09", "栃木県", 3, "北関東"),
    ("10", "群馬県", 3, "北関東"), ("11", "埼玉県", 3, "北関東"), ("12", "千葉県", 4, "南関東"),
    ("13", "東京都", 5, "東京"), ("14", "神奈川県", 4, "南関東"), ("15", "新潟県", 6, "北陸信越"),
    ("16", "富山県", 6, "北陸信越"), ("17", "石川県", 6, "北陸信越"), ("18", "福井県", 6, "北陸信越"),
    ("19", "山梨県", 7, "東海"), ("20", "長野県", 6, "北陸信越"), ("21", "岐阜県", 7, "東海"),
    ("22", "静岡県", 7, "東海"), ("23", "愛知県", 7, "東海"), ("24", "三重県", 7, "東海"),
    ("25", "滋賀県", 8, "近畿"), ("26", "京都府", 8, "近畿"), ("27", "大阪府", 8, "近畿"),
    ("28", "兵庫県", 8, "近畿"), ("29", "奈良県", 8, "近畿"), ("30", "和歌山県", 8, "近畿"),
    ("31", "鳥取県", 9, "中国"), ("32", "島根県", 9, "中国"), ("33", "岡山県", 9, "中国"),
    ("34", "広島県", 9, "中国"), ("35", "山口県", 9, "中国"), ("36", "徳島県", 10, "四国"),
    ("37", "香川県", 10, "四国"), ("38", "愛媛県", 10, "四国"), ("39", "高知県", 10, "四国"),
    ("40", "福岡県", 11, "九州"), ("41", "佐賀県", 11, "九州"), ("42", "長崎県", 11, "九州"),
    ("43", "熊本県", 11, "九州"), ("44", "大分県", 11, "九州"), ("45", "宮崎県", 11, "九州"),
    ("46", "鹿児島県", 11, "九州"), ("47", "沖縄県", 11, "九州"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
struct PrefectureEntry {
    name: Arc<str>,
    block: ParentRef,
}

/// The district → prefecture → block master table.
///
/// Stored per prefecture; district rows only contribute their prefecture's
/// entry, since a district code's first two digits are its prefecture.
#[derive(Debug, Clone, Default)]
pub struct MasterCrosswalk {
    prefectures: BTreeMap<UnitCode, PrefectureEntry>,
}

impl MasterCrosswalk {
    /// The built-in 47-prefecture, 11-block table.
    pub fn embedded() -> Result<Self> {
        let mut master = Self::default();
        for (pref, pref_name, block, block_name) in PREF_BLOCK_ROWS {
            master.add_row(pref, pref_name, &block.to_string(), block_name)?;
        }
        Ok(master)
    }

    /// Read a `district_master.csv` with `pref_code`, `pref_name`, `block_id`
    /// and `block_name` columns. Any other columns are ignored.
    pub fn from_csv(path: &Path) -> Result<Self> {
        let df = read_csv(path, &["pref_code", "block_id"])?;
        let columns = ["pref_code", "pref_name", "block_id", "block_name"].iter()
            .map(|name| text_column(&df, name))
            .collect::<Result<Vec<_>>>()?;

        let mut master = Self::default();
        for i in 0..df.height() {
            let field = |c: usize| columns[c][i].as_deref()
                .with_context(|| format!("[aggregate::crosswalk] row {i}: empty {}", ["pref_code", "pref_name", "block_id", "block_name"][c]));
            master.add_row(field(0)?, field(1)?, field(2)?, field(3)?)
                .with_context(|| format!("[aggregate::crosswalk] Invalid master table: {}", path.display()))?;
        }
        Ok(master)
    }

    /// Add one row; a prefecture may appear many times but always with the same entry.
    fn add_row(&mut self, pref: &str, pref_name: &str, block: &str, block_name: &str) -> Result<()> {
        let code = UnitCode::normalize(Level::Prefecture, pref)?;
        let entry = PrefectureEntry {
            name: Arc::from(pref_name),
            block: ParentRef {
                code: UnitCode::normalize(Level::Block, block)?,
                name: Arc::from(block_name),
            },
        };
        match self.prefectures.get(&code) {
            Some(existing) if *existing != entry => bail!(
                "[aggregate::crosswalk] prefecture {code} maps to both {} {} and {} {}",
                existing.block.code, existing.block.name, entry.block.code, entry.block.name,
            ),
            Some(_) => {}
            None => { self.prefectures.insert(code, entry); }
        }
        Ok(())
    }

    #[inline] pub fn len(&self) -> usize { self.prefectures.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.prefectures.is_empty() }

    pub fn prefecture_name(&self, code: &UnitCode) -> Option<&str> {
        self.prefectures.get(code).map(|entry| &*entry.name)
    }

    /// Prefecture → block view.
    #[inline] pub fn pref_to_block(&self) -> PrefToBlock<'_> { PrefToBlock { master: self } }

    /// District or municipality → prefecture view, by code prefix.
    #[inline] pub fn prefix(&self) -> PrefixCrosswalk<'_> { PrefixCrosswalk { master: self } }
}

/// Maps prefectures to proportional-representation blocks.
#[derive(Debug, Clone, Copy)]
pub struct PrefToBlock<'a> {
    master: &'a MasterCrosswalk,
}

impl Crosswalk for PrefToBlock<'_> {
    fn parent_level(&self) -> Level { Level::Block }

    fn parent(&self, code: &UnitCode) -> Option<ParentRef> {
        if code.level() != Level::Prefecture { return None }
        self.master.prefectures.get(code).map(|entry| entry.block.clone())
    }
}

/// Maps districts and municipalities to their prefecture by 2-digit code prefix.
#[derive(Debug, Clone, Copy)]
pub struct PrefixCrosswalk<'a> {
    master: &'a MasterCrosswalk,
}

impl Crosswalk for PrefixCrosswalk<'_> {
    fn parent_level(&self) -> Level { Level::Prefecture }

    fn parent(&self, code: &UnitCode) -> Option<ParentRef> {
        if !matches!(code.level(), Level::District | Level::Municipality) { return None }
        let pref = code.prefecture_prefix()?;
        let entry = self.master.prefectures.get(&pref)?;
        Some(ParentRef { code: pref, name: entry.name.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn code(level: Level, raw: &str) -> UnitCode {
        UnitCode::normalize(level, raw).unwrap()
    }

    #[test]
    fn embedded_table_covers_47_prefectures_in_11_blocks() {
        let master = MasterCrosswalk::embedded().unwrap();
        assert_eq!(master.len(), 47);
        let blocks = master.prefectures.values().map(|e| e.block.code.clone()).collect::<BTreeSet<_>>();
        assert_eq!(blocks.len(), 11);
    }

    #[test]
    fn pref_to_block_lookup() {
        let master = MasterCrosswalk::embedded().unwrap();
        let tokyo = master.pref_to_block().parent(&code(Level::Prefecture, "13")).unwrap();
        assert_eq!(tokyo.code.as_str(), "05");
        assert_eq!(&*tokyo.name, "東京");
        let yamanashi = master.pref_to_block().parent(&code(Level::Prefecture, "19")).unwrap();
        assert_eq!(&*yamanashi.name, "東海");
    }

    #[test]
    fn prefix_lookup() {
        let master = MasterCrosswalk::embedded().unwrap();
        let parent = master.prefix().parent(&code(Level::Municipality, "27127")).unwrap();
        assert_eq!(parent.code.as_str(), "27");
        assert_eq!(&*parent.name, "大阪府");
        let parent = master.prefix().parent(&code(Level::District, "4701")).unwrap();
        assert_eq!(&*parent.name, "沖縄県");
        assert!(master.prefix().parent(&code(Level::Municipality, "48001")).is_none());
    }

    #[test]
    fn conflicting_rows_are_rejected() {
        let mut master = MasterCrosswalk::default();
        master.add_row("13", "東京都", "5", "東京").unwrap();
        master.add_row("13", "東京都", "5", "東京").unwrap();
        assert!(master.add_row("13", "東京都", "4", "南関東").is_err());
    }

    #[test]
    fn reads_district_master_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("district_master.csv");
        std::fs::write(
            &path,
            "pref_code,district_num,district_code,district_name,pref_name,block_id,block_name\n\
             01,1,0101,北海道1区,北海道,1,北海道\n\
             01,2,0102,北海道2区,北海道,1,北海道\n\
             13,1,1301,東京1区,東京都,5,東京\n",
        ).unwrap();
        let master = MasterCrosswalk::from_csv(&path).unwrap();
        assert_eq!(master.len(), 2);
        assert_eq!(master.prefecture_name(&code(Level::Prefecture, "1")), Some("北海道"));
    }
}
