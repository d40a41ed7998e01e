use super::PromptKind;
use crate::news::NewsItem;

const CLASSIC: &str = r#"Tu es rédacteur pour UpNews, une app qui partage une bonne nouvelle par jour.

Voici les faits bruts d'une actualité positive :

**TITRE SOURCE** : {title}
**FAITS CLÉS** : {description}
**LIEN SOURCE** : {url}

À partir de ces faits uniquement, rédige un article de 250 à 280 mots dans le style d'un journal papier de qualité.
Commence par un titre en gras (**Titre**, 10 mots maximum, formulé différemment du titre source),
puis un chapeau d'une ou deux phrases, puis trois ou quatre paragraphes courts sans intertitres.
Ton précis, sobre, sans sensationnalisme. Termine par une phrase factuelle, sans morale."#;

const IMMERSIVE: &str = r#"Tu es rédacteur pour UpNews, une app qui partage une bonne nouvelle par jour.

**TITRE SOURCE** : {title}
**FAITS CLÉS** : {description}
**LIEN SOURCE** : {url}

Rédige un récit immersif de 250 à 280 mots qui place le lecteur au cœur de la scène,
en restant strictement fidèle aux faits fournis. Commence par un titre en gras (**Titre**, 10 mots maximum).
Paragraphes courts, présent de narration, aucune invention de personnes ou de chiffres."#;

const QA: &str = r#"Tu es rédacteur pour UpNews, une app qui partage une bonne nouvelle par jour.

**TITRE SOURCE** : {title}
**FAITS CLÉS** : {description}
**LIEN SOURCE** : {url}

Présente cette actualité sous forme de questions-réponses (4 à 5 questions), 250 à 280 mots au total.
Commence par un titre en gras (**Titre**, 10 mots maximum). Questions en gras, réponses courtes et factuelles,
uniquement à partir des faits fournis."#;

fn template(kind: PromptKind) -> &'static str {
    match kind {
        PromptKind::Classic => CLASSIC,
        PromptKind::Immersive => IMMERSIVE,
        PromptKind::Qa => QA,
    }
}

/// Fill the template of `kind` with the item's title, description and url.
pub fn render(kind: PromptKind, item: &NewsItem) -> String {
    template(kind)
        .replace("{title}", &item.title)
        .replace("{description}", &item.description)
        .replace("{url}", &item.url)
}
