// Prompt text for labeling clusters with an external language model.
//
// The crate only writes the text; sending it to a model (and merging the
// answers back) happens elsewhere. The instructions are in Spanish because
// the analysts and the posts are.

use std::collections::BTreeMap;

use crate::topics::frequency::KeywordFrequency;

const INSTRUCTIONS: &str = "Eres un analista de datos experto en comunicación corporativa. \
Analiza las siguientes listas de palabras clave y genera una tabla que asigne una temática \
dominante y los riesgos reputacionales asociados por cada cluster.\n\n\
Los resultados esperados son:\n\
1) Tabla con columnas: Cluster | Temática | Riesgos reputacionales\n\
2) Tabla de resumen (omite cualquier explicación detallada. Usa solo frases breves o palabras \
clave por riesgo reputacional): Cluster | Temática | Riesgos reputacionales (tópicos generales)\n\
3) Exporta ambas tablas en un archivo de Excel, el cual tendra por nombre 6_LLM_Respuestas, \
usando una hoja por tabla.\n\n\
A continuación, las palabras clave agrupadas por cluster:\n";

const BLOCK_SEPARATOR: &str = "\n\n--------------\n\n";

/// Build the prompt from a per-cluster keyword table.
///
/// Clusters appear in ascending label order; each block lists its words in
/// table order.
pub fn build_prompt(table: &[KeywordFrequency]) -> String {
    let mut clusters: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for row in table {
        clusters
            .entry(row.group.as_str())
            .or_default()
            .push(row.word.as_str());
    }

    let blocks: Vec<String> = clusters
        .into_iter()
        .map(|(cluster, words)| format!("{cluster}:\n{}", words.join(", ")))
        .collect();

    format!("{INSTRUCTIONS}\n\n{}", blocks.join(BLOCK_SEPARATOR))
}
