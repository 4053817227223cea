pub mod criteria;
pub mod settings;

use settings::Settings;
use std::path::Path;

/// 設定ファイルを読み込む。パスが指定されなければデフォルト設定を返す。
pub fn load_settings(path: Option<&Path>) -> crate::error::Result<Settings> {
    match path {
        Some(p) => Settings::from_file(p),
        None => Ok(Settings::default()),
    }
}
