use std::io::{self, Write};

use crate::ast::{Blob, Commit, FileOp, Mark, PersonIdent, Record, Reset};

pub trait Dump {
    fn dump<W: Write>(&self, w: &mut W) -> io::Result<()>;
}

impl Dump for Mark {
    fn dump<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "mark :{}", self.get())
    }
}

impl Dump for PersonIdent {
    fn dump<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&self.name)?;
        w.write_all(b" <")?;
        w.write_all(&self.email)?;
        writeln!(w, "> {} +0000", self.when_unix)
    }
}

impl Dump for Blob {
    fn dump<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(b"blob\n")?;
        self.mark.dump(w)?;
        if let Some(data) = &self.data {
            writeln!(w, "data {}", data.len())?;
            w.write_all(data)?;
            w.write_all(b"\n")?;
        }
        Ok(())
    }
}

impl Dump for FileOp {
    fn dump<W: Write>(&self, w: &mut W) -> io::Result<()> {
        match self {
            FileOp::Modify { mode, mark, path } => {
                write!(w, "M {} :{} ", mode.as_octal(), mark.get())?;
                w.write_all(path)?;
                w.write_all(b"\n")
            }
            FileOp::Delete { path } => {
                w.write_all(b"D ")?;
                w.write_all(path)?;
                w.write_all(b"\n")
            }
        }
    }
}

impl Dump for Commit {
    fn dump<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(b"commit ")?;
        w.write_all(&self.branch)?;
        w.write_all(b"\n")?;
        self.mark.dump(w)?;
        w.write_all(b"author ")?;
        self.author.dump(w)?;
        w.write_all(b"committer ")?;
        self.committer.dump(w)?;
        writeln!(w, "data {}", self.message.len())?;
        w.write_all(&self.message)?;
        w.write_all(b"\n")?;
        if let Some(from) = self.from {
            writeln!(w, "from :{}", from.get())?;
        }
        for merge in &self.merge {
            writeln!(w, "merge :{}", merge.get())?;
        }
        for op in &self.file_ops {
            op.dump(w)?;
        }
        Ok(())
    }
}

impl Dump for Reset {
    fn dump<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(b"reset ")?;
        w.write_all(&self.ref_name)?;
        w.write_all(b"\n")?;
        if let Some(from) = self.from {
            writeln!(w, "from :{}", from.get())?;
        }
        Ok(())
    }
}

impl Dump for Record {
    fn dump<W: Write>(&self, w: &mut W) -> io::Result<()> {
        match self {
            Record::Blob(b) => b.dump(w),
            Record::Commit(c) => c.dump(w),
            Record::Reset(r) => r.dump(w),
        }
    }
}

/// Dumps a full stream: every record, followed by a blank line, as the
/// fast-import grammar expects between commands.
pub fn dump_stream<W: Write>(records: &[Record], w: &mut W) -> io::Result<()> {
    for record in records {
        record.dump(w)?;
        w.write_all(b"\n")?;
    }
    Ok(())
}
