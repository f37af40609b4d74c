// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Declarative attribute schemas.
//!
//! Schemas describe the configuration surface of the provider block and
//! of each resource: attribute names, types, and whether they are
//! required or sensitive. They carry no behavior of their own; they
//! exist so callers can enumerate and document the surface without
//! instantiating anything.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeType {
    Bool,
    Int32,
    Int64,
    String,
}

#[derive(Clone, Debug)]
pub struct Attribute {
    pub name: &'static str,
    pub attr_type: AttributeType,
    pub description: &'static str,
    pub required: bool,
    pub sensitive: bool,
}

impl Attribute {
    pub fn required(
        name: &'static str,
        attr_type: AttributeType,
        description: &'static str,
    ) -> Attribute {
        Attribute {
            name,
            attr_type,
            description,
            required: true,
            sensitive: false,
        }
    }

    pub fn optional(
        name: &'static str,
        attr_type: AttributeType,
        description: &'static str,
    ) -> Attribute {
        Attribute {
            name,
            attr_type,
            description,
            required: false,
            sensitive: false,
        }
    }

    pub fn sensitive(mut self) -> Attribute {
        self.sensitive = true;
        self
    }
}

#[derive(Clone, Debug)]
pub struct Schema {
    pub description: &'static str,
    pub attributes: Vec<Attribute>,
}

impl Schema {
    pub fn new(description: &'static str, attributes: Vec<Attribute>) -> Schema {
        Schema {
            description,
            attributes,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}
