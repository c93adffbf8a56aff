use std::collections::HashMap;
use heck::ToSnakeCase;
use parking_lot::RwLock;
use crate::core::error::{Error, Result};
use crate::core::record::Record;
use crate::core::table::Model;
use crate::query::ast::Constraints;
use crate::query::relation::Relation;

/// How a model reaches another model's records
#[derive(Clone)]
pub enum Association {
    HasMany { target: Model, foreign_key: String },
    HasOne { target: Model, foreign_key: String },
    BelongsTo { target: Model, foreign_key: String },
}

/// What an association resolves to for one record
#[derive(Debug, Clone)]
pub enum Associated {
    Many(Relation),
    One(Option<Record>),
}

impl Associated {
    pub fn into_relation(self) -> Option<Relation> {
        match self {
            Associated::Many(relation) => Some(relation),
            Associated::One(_) => None,
        }
    }

    pub fn into_record(self) -> Option<Record> {
        match self {
            Associated::One(record) => record,
            Associated::Many(relation) => relation.first(),
        }
    }
}

#[derive(Default)]
pub struct AssociationRegistry {
    associations: RwLock<HashMap<String, Association>>,
}

impl AssociationRegistry {
    pub fn insert(&self, name: &str, association: Association) {
        self.associations.write().insert(name.to_string(), association);
    }

    pub fn get(&self, name: &str) -> Option<Association> {
        self.associations.read().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.associations.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Association {
    pub fn resolve(&self, record: &Record) -> Associated {
        match self {
            Association::HasMany { target, foreign_key } => {
                Associated::Many(target.filter(owner_constraint(foreign_key, record)))
            }
            Association::HasOne { target, foreign_key } => {
                Associated::One(target.filter(owner_constraint(foreign_key, record)).first())
            }
            Association::BelongsTo { target, foreign_key } => {
                Associated::One(target.find_by_id(record.read(foreign_key)))
            }
        }
    }
}

fn owner_constraint(foreign_key: &str, owner: &Record) -> Constraints {
    Constraints::new().with(foreign_key, owner.get("id").clone())
}

impl Model {
    /// `<snake model name>_id`, the default key pointing back at this model.
    pub fn foreign_key(&self) -> String {
        format!("{}_id", self.name().to_snake_case())
    }

    pub fn has_many(&self, name: &str, target: &Model, foreign_key: Option<&str>) {
        let foreign_key = foreign_key.map(str::to_string).unwrap_or_else(|| self.foreign_key());
        self.associations().insert(
            name,
            Association::HasMany { target: target.clone(), foreign_key },
        );
    }

    pub fn has_one(&self, name: &str, target: &Model, foreign_key: Option<&str>) {
        let foreign_key = foreign_key.map(str::to_string).unwrap_or_else(|| self.foreign_key());
        self.associations().insert(
            name,
            Association::HasOne { target: target.clone(), foreign_key },
        );
    }

    pub fn belongs_to(&self, name: &str, target: &Model, foreign_key: Option<&str>) {
        let foreign_key = foreign_key
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}_id", name.to_snake_case()));
        self.associations().insert(
            name,
            Association::BelongsTo { target: target.clone(), foreign_key },
        );
    }

    pub fn association_names(&self) -> Vec<String> {
        self.associations().names()
    }

    pub fn association(&self, record: &Record, name: &str) -> Result<Associated> {
        let association = self
            .associations()
            .get(name)
            .ok_or_else(|| Error::no_method(name, self.name()))?;
        Ok(association.resolve(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::core::types::{attributes, Value};

    fn fixtures() -> (Model, Model) {
        let countries = Model::new("Country");
        countries
            .set_data(vec![
                attributes([("id", Value::from(1)), ("name", Value::from("US"))]),
                attributes([("id", Value::from(2)), ("name", Value::from("Canada"))]),
            ])
            .unwrap();

        let cities = Model::new("City");
        cities
            .set_data(vec![
                attributes([("id", Value::from(1)), ("country_id", Value::from(1)), ("name", Value::from("Boston"))]),
                attributes([("id", Value::from(2)), ("country_id", Value::from(2)), ("name", Value::from("Ottawa"))]),
                attributes([("id", Value::from(3)), ("country_id", Value::from(1)), ("name", Value::from("Austin"))]),
            ])
            .unwrap();

        countries.has_many("cities", &cities, None);
        countries.has_one("city", &cities, None);
        cities.belongs_to("country", &countries, None);
        (countries, cities)
    }

    #[test]
    fn has_many_filters_by_owner_id() {
        let (countries, _) = fixtures();
        let us = countries.find(1).unwrap();

        let cities = countries.association(&us, "cities").unwrap().into_relation().unwrap();
        assert_eq!(cities.pluck(&["name"]), vec![Value::from("Boston"), Value::from("Austin")]);
    }

    #[test]
    fn has_one_takes_the_first_match() {
        let (countries, _) = fixtures();
        let canada = countries.find(2).unwrap();

        let city = countries.association(&canada, "city").unwrap().into_record().unwrap();
        assert_eq!(city.get("name"), &Value::from("Ottawa"));
    }

    #[test]
    fn belongs_to_uses_the_index() {
        let (countries, cities) = fixtures();
        let austin = cities.find(3).unwrap();

        let country = cities.association(&austin, "country").unwrap().into_record();
        assert_eq!(country, Some(countries.find(1).unwrap()));

        let orphan = cities.new_record(attributes([("country_id", 99)]));
        assert!(cities.association(&orphan, "country").unwrap().into_record().is_none());
    }

    #[test]
    fn unknown_association_is_a_missing_method() {
        let (countries, _) = fixtures();
        let us = countries.find(1).unwrap();

        let err = countries.association(&us, "states").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoMethod);
        assert_eq!(countries.association_names(), vec!["cities", "city"]);
    }

    #[test]
    fn default_foreign_keys() {
        let model = Model::new("CountryRegion");
        assert_eq!(model.foreign_key(), "country_region_id");
    }
}
