use std::{
    collections::HashSet,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use noodles::fasta::{self as fasta, record::Definition, Record};

use crate::{error::Result, foldseek::StructuralHit};

// A deduplicated target sequence with the metadata of the hit that first
// produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceRecord {
    pub id: String,
    pub description: String,
    pub sequence: String,
}

impl SequenceRecord {
    fn from_hit(hit: &StructuralHit) -> Self {
        Self {
            id: hit.theader.clone(),
            description: format!(
                "pident={} evalue={:e} taxid={} taxname={}",
                hit.pident, hit.evalue, hit.taxid, hit.taxname
            ),
            sequence: hit.tseq.clone(),
        }
    }

    fn to_fasta(&self) -> Record {
        let definition = Definition::new(self.id.clone(), Some(self.description.clone()));
        Record::new(definition, self.sequence.as_bytes().to_vec().into())
    }
}

// Collapse hits that share the exact same target sequence. The first hit
// for each sequence is kept, with its own header and metadata, and the
// output follows input order.
pub fn remove_duplicates(hits: &[StructuralHit]) -> Vec<SequenceRecord> {
    let mut seen: HashSet<&str> = HashSet::new();
    hits.iter()
        .filter(|&hit| seen.insert(hit.tseq.as_str()))
        .map(SequenceRecord::from_hit)
        .collect()
}

pub fn write_fasta(path: &Path, records: &[SequenceRecord]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    let mut writer = fasta::Writer::new(&mut out);
    for record in records {
        writer.write_record(&record.to_fasta())?;
    }
    drop(writer);
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foldseek::{read_m8, tests::m8_line};
    use std::fs;

    fn hits(lines: &[String]) -> Vec<StructuralHit> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hits.m8");
        fs::write(&path, lines.join("\n") + "\n").unwrap();
        read_m8(&path).unwrap()
    }

    #[test]
    fn identical_sequences_collapse_to_first_header() {
        let hits = hits(&[m8_line("seq1", 99.5, "1e-20", "ATGC"), m8_line("seq2", 97.0, "1e-30", "ATGC")]);

        let records = remove_duplicates(&hits);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "seq1");
        assert_eq!(records[0].sequence, "ATGC");
        assert_eq!(
            records[0].description,
            "pident=99.5 evalue=1e-20 taxid=562 taxname=Escherichia coli"
        );
    }

    #[test]
    fn same_header_different_sequence_is_kept() {
        let hits = hits(&[m8_line("seq1", 90.0, "1e-20", "AAAA"), m8_line("seq1", 90.0, "1e-20", "CCCC")]);
        assert_eq!(remove_duplicates(&hits).len(), 2);
    }

    #[test]
    fn first_occurrence_order_and_uniqueness() {
        let hits = hits(&[
            m8_line("a", 90.0, "1e-20", "S1"),
            m8_line("b", 90.0, "1e-20", "S2"),
            m8_line("c", 90.0, "1e-20", "S1"),
            m8_line("d", 90.0, "1e-20", "S3"),
            m8_line("e", 90.0, "1e-20", "S2"),
        ]);

        let records = remove_duplicates(&hits);
        assert!(records.len() <= hits.len());
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "d"]);

        let unique: HashSet<&str> = records.iter().map(|r| r.sequence.as_str()).collect();
        assert_eq!(unique.len(), records.len());
    }

    #[test]
    fn empty_input_gives_no_records() {
        assert!(remove_duplicates(&[]).is_empty());
    }

    #[test]
    fn fasta_output_has_description_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodup.fasta");
        let records = vec![
            SequenceRecord {
                id: "seq1".to_string(),
                description: "pident=99 evalue=1e-20 taxid=562 taxname=E. coli".to_string(),
                sequence: "MKVL".to_string(),
            },
            SequenceRecord {
                id: "seq2".to_string(),
                description: "pident=98 evalue=1e-15 taxid=1280 taxname=S. aureus".to_string(),
                sequence: "MAAT".to_string(),
            },
        ];

        write_fasta(&path, &records).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            ">seq1 pident=99 evalue=1e-20 taxid=562 taxname=E. coli\nMKVL\n\
             >seq2 pident=98 evalue=1e-15 taxid=1280 taxname=S. aureus\nMAAT\n"
        );
    }
}
