use crate::{tail, ui};
use anyhow::Result;

pub fn execute(port: u16) -> Result<()> {
    ui::status("Serving", format!("tail UI on http://127.0.0.1:{port}"));
    tail::serve(port)
}
