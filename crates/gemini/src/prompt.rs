//! Prompt text for the three calls.

use roadlore_context::{ExploreMode, Place, Position};

pub(crate) fn context(position: &Position, mode: ExploreMode, highlight_prefix: &str) -> String {
    let style = match mode {
        ExploreMode::Driving => {
            "O usuário está dirigindo. Responda com no máximo uma frase de impacto."
        }
        ExploreMode::Standing => "O usuário está explorando a pé. Pode dar mais detalhes.",
    };
    let places = match mode {
        ExploreMode::Driving => "",
        ExploreMode::Standing => "3. Depois, descreva até 3 locais históricos próximos.\n",
    };

    format!(
        "Localização atual: latitude {lat}, longitude {lng}.\n\
         {style}\n\n\
         1. Escolha o fato mais curioso sobre um local histórico num raio de 1 km.\n\
         2. Escreva a primeira linha exatamente assim: \"{highlight_prefix} <fato curto>\" \
         seguida de uma linha em branco.\n\
         {places}\
         Use a ferramenta Google Maps.",
        lat = position.latitude,
        lng = position.longitude,
    )
}

pub(crate) fn narration(text: &str) -> String {
    format!("Conte de forma breve e curiosa: {text}")
}

pub(crate) fn itinerary(places: &[Place]) -> String {
    let list = places
        .iter()
        .map(|p| format!("- {}", p.title))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Crie um roteiro histórico curto em formato de e-mail.\n\n\
         Locais visitados:\n{list}\n\n\
         Inclua uma linha de assunto, uma introdução breve e uma frase sobre cada local."
    )
}
